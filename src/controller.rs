//! Session window controller
//!
//! One detached window showing one terminal session. The controller owns
//! the view and the session while the window is open, keeps the background
//! in step with geometry, schema and desktop changes, and decides at
//! teardown who ends up owning the view and the session:
//!
//! * the session ended: both are destroyed and the parent is told the window
//!   closed with nothing to reuse;
//! * the window was detached (attach elsewhere, or dropped while active):
//!   both are handed to the parent for reuse and only the shell is closed.
//!
//! Exactly one of the two happens, exactly once.

use std::sync::Arc;

use bitflags::bitflags;
use termchild_proto::{MenuAction, SignalKind, WindowEvent};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::background::{BackgroundCompositor, CompositedImage};
use crate::config::{Config, MenuConfig, ViewOptions};
use crate::desktop::{Desktop, DesktopId, DesktopVisibilityTracker, Repaint, WallpaperState};
use crate::geometry::{PixelSize, TermSize};
use crate::host::{signal_for, Background, HostCapabilities, HostWindow, Session, TerminalView, TextPrompt};
use crate::menu::ContextMenu;
use crate::mirror::RootMirror;
use crate::schema::{Schema, Transparency};

/// Smallest size the view may be shrunk to
pub const MINIMUM_VIEW_SIZE: PixelSize = PixelSize {
    width: 150,
    height: 70,
};

bitflags! {
    /// Event sources the controller is listening to
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Listeners: u16 {
        const SESSION_DONE = 1 << 0;
        const TITLE = 1 << 1;
        const RENAME = 1 << 2;
        const MASTER_MODE = 1 << 3;
        const IMAGE_SIZE = 1 << 4;
        const COLUMNS = 1 << 5;
        const BACKGROUND = 1 << 6;
        const DESKTOP = 1 << 7;
        /// Listeners on the session's emulation
        const EMULATION = Self::IMAGE_SIZE.bits() | Self::COLUMNS.bits();
    }
}

impl Listeners {
    /// Listener an event arrives through; `None` for direct user input
    pub fn for_event(event: &WindowEvent) -> Option<Listeners> {
        match event {
            WindowEvent::SessionDone => Some(Listeners::SESSION_DONE),
            WindowEvent::SessionTitleChanged => Some(Listeners::TITLE),
            WindowEvent::SessionRenamed { .. } => Some(Listeners::RENAME),
            WindowEvent::MasterModeEnabled => Some(Listeners::MASTER_MODE),
            WindowEvent::ImageSizeChanged { .. } => Some(Listeners::IMAGE_SIZE),
            WindowEvent::ColumnsChanged { .. } => Some(Listeners::COLUMNS),
            WindowEvent::BackgroundChanged { .. } => Some(Listeners::BACKGROUND),
            WindowEvent::DesktopActivated { .. } => Some(Listeners::DESKTOP),
            WindowEvent::ConfigureRequest { .. }
            | WindowEvent::WindowMoved { .. }
            | WindowEvent::Menu { .. } => None,
        }
    }
}

/// Where the window is in its life; only `Active` may change, once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    /// The session ended; view and session were destroyed
    Terminated,
    /// View and session were handed back to the parent
    Detached,
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("window already closed ({state:?}); teardown runs once")]
    AlreadyClosed { state: Lifecycle },
    #[error("stale session reference: window is {state:?}")]
    StaleSession { state: Lifecycle },
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

/// Identifies a child window to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildId(pub u64);

/// View and session handed back for reuse
#[derive(Debug)]
pub struct DetachedSession<V, S> {
    pub view: V,
    pub session: S,
}

/// Sent to the parent exactly once per window
#[derive(Debug)]
pub struct WindowClosed<V, S> {
    pub child: ChildId,
    pub reusable: Option<DetachedSession<V, S>>,
}

/// Objects the window is built from
pub struct WindowParts<V, S, W> {
    pub view: V,
    pub session: S,
    pub window: W,
}

/// Collaborators the controller queries but does not own exclusively
pub struct Collaborators {
    pub desktop: Box<dyn Desktop>,
    pub prompt: Box<dyn TextPrompt>,
    pub caps: HostCapabilities,
}

/// Construction options
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    /// 0 in either dimension means 80x24
    pub columns: u16,
    pub lines: u16,
    pub fixed_size: bool,
    pub allow_resize_from_session: bool,
    pub view: ViewOptions,
    pub menu: MenuConfig,
}

impl WindowOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            columns: config.window.columns,
            lines: config.window.lines,
            fixed_size: config.window.fixed_size,
            allow_resize_from_session: config.window.allow_resize_from_session,
            view: config.view.clone(),
            menu: config.menu.clone(),
        }
    }
}

struct Linked<V, S> {
    view: V,
    session: S,
}

/// Controller of one detached session window
pub struct SessionWindowController<V, S, W>
where
    V: TerminalView,
    S: Session,
    W: HostWindow,
{
    id: ChildId,
    lifecycle: Lifecycle,
    linked: Option<Linked<V, S>>,
    window: W,
    desktop: Box<dyn Desktop>,
    prompt: Box<dyn TextPrompt>,
    caps: HostCapabilities,
    schema: Arc<Schema>,
    compositor: BackgroundCompositor,
    tracker: DesktopVisibilityTracker,
    mirror: Option<RootMirror>,
    menu: Option<ContextMenu>,
    listeners: Listeners,
    allow_resize: bool,
    fixed_size: bool,
    closed_tx: UnboundedSender<WindowClosed<V, S>>,
}

impl<V, S, W> SessionWindowController<V, S, W>
where
    V: TerminalView,
    S: Session,
    W: HostWindow,
{
    /// Build the window around `parts`: configure the view, apply geometry
    /// and schema, compose the title and start listening.
    pub fn initialize(
        id: ChildId,
        parts: WindowParts<V, S, W>,
        collaborators: Collaborators,
        options: &WindowOptions,
        schema: Arc<Schema>,
        closed_tx: UnboundedSender<WindowClosed<V, S>>,
    ) -> Self {
        let WindowParts {
            mut view,
            session,
            window,
        } = parts;

        view.apply_options(&options.view);
        view.set_terminal_size_startup(false);
        view.set_minimum_size(MINIMUM_VIEW_SIZE);
        view.set_focus();

        let mut controller = Self {
            id,
            lifecycle: Lifecycle::Active,
            linked: Some(Linked { view, session }),
            window,
            desktop: collaborators.desktop,
            prompt: collaborators.prompt,
            caps: collaborators.caps,
            schema: Arc::clone(&schema),
            compositor: BackgroundCompositor::new(),
            tracker: DesktopVisibilityTracker::new(),
            mirror: None,
            menu: None,
            listeners: Listeners::empty(),
            allow_resize: options.allow_resize_from_session,
            fixed_size: options.fixed_size,
            closed_tx,
        };

        controller.set_geometry(options.columns, options.lines);
        controller.set_schema(schema);
        controller.update_title();

        controller.listeners = Listeners::all();
        controller.menu = ContextMenu::build(&options.menu);

        info!(
            "Child window {} ready ({} menu, true alpha: {})",
            id.0,
            if controller.menu.is_some() { "with" } else { "no" },
            controller.caps.true_alpha
        );
        controller
    }

    /// Bind the session's output to this window's view
    pub fn run(&mut self) -> Result<(), WindowError> {
        let state = self.lifecycle;
        let linked = self
            .linked
            .as_mut()
            .ok_or(WindowError::StaleSession { state })?;
        linked.session.set_connect(true);
        Ok(())
    }

    /// Dispatch one event
    pub fn handle(&mut self, event: WindowEvent) -> Result<(), WindowError> {
        match Listeners::for_event(&event) {
            Some(listener) if !self.listeners.contains(listener) => {
                debug!("Not listening for {:?}, dropping", event);
                return Ok(());
            }
            None if self.lifecycle != Lifecycle::Active => {
                debug!("Window is {:?}, dropping {:?}", self.lifecycle, event);
                return Ok(());
            }
            _ => {}
        }

        match event {
            WindowEvent::SessionDone => self.end_session(),
            WindowEvent::SessionTitleChanged => {
                self.update_title();
                Ok(())
            }
            WindowEvent::SessionRenamed { title } => {
                debug!("Session renamed to {:?}", title);
                self.update_title();
                Ok(())
            }
            WindowEvent::MasterModeEnabled => self.enable_master_mode(),
            WindowEvent::ImageSizeChanged { .. } => {
                self.on_image_size_notify();
                Ok(())
            }
            WindowEvent::ColumnsChanged { columns } => self.on_columns_changed_by_session(columns),
            WindowEvent::BackgroundChanged { desktop } => {
                self.on_background_changed(DesktopId(desktop));
                Ok(())
            }
            WindowEvent::DesktopActivated { desktop } => {
                self.on_desktop_activated(DesktopId(desktop));
                Ok(())
            }
            WindowEvent::ConfigureRequest { x, y } => {
                self.show_menu(x, y);
                Ok(())
            }
            WindowEvent::WindowMoved { .. } => {
                self.repaint_mirror();
                Ok(())
            }
            WindowEvent::Menu { action } => self.activate(action),
        }
    }

    /// Resize to `columns` x `lines` (80x24 if either is zero)
    pub fn set_geometry(&mut self, columns: u16, lines: u16) {
        let size = TermSize::or_default(columns, lines);
        let Some(linked) = self.linked.as_mut() else {
            warn!("Window {} is closed, ignoring resize to {:?}", self.id.0, size);
            return;
        };

        if self.fixed_size {
            linked.view.set_fixed_size(size);
        } else {
            linked.view.set_size(size);
        }
        self.window.adjust_size(linked.view.pixel_size());
        if self.fixed_size {
            let hint = self.window.size_hint();
            self.window.set_fixed_size(hint);
        }
        debug!("Geometry {}x{} -> window {:?}", size.columns, size.lines, self.window.size());

        if self.mirror.is_some() {
            self.repaint_mirror();
        } else if self.schema.alignment.follows_size() {
            self.refresh_background(false);
        }
    }

    /// Column change requested by the program in the session
    pub fn on_columns_changed_by_session(&mut self, columns: u16) -> Result<(), WindowError> {
        if !self.allow_resize {
            debug!("Resize from session not allowed, ignoring {} columns", columns);
            return Ok(());
        }

        let state = self.lifecycle;
        let lines = self
            .linked
            .as_ref()
            .ok_or(WindowError::StaleSession { state })?
            .view
            .term_size()
            .lines;
        self.set_geometry(columns, lines);
        if let Some(linked) = self.linked.as_mut() {
            linked.view.update();
        }
        Ok(())
    }

    /// The view changed size on its own (user drag); size-dependent
    /// backgrounds are recomposed even if the size did not change.
    pub fn on_image_size_notify(&mut self) {
        if self.mirror.is_some() {
            self.repaint_mirror();
        } else if self.schema.alignment.follows_size() {
            self.refresh_background(true);
        }
    }

    /// Replace the active schema
    pub fn set_schema(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
        let schema = Arc::clone(&self.schema);
        let Some(linked) = self.linked.as_mut() else {
            warn!("Window {} is closed, schema {:?} not applied", self.id.0, schema.name);
            return;
        };

        linked.view.set_color_table(&schema.table);

        if schema.use_transparency && !self.caps.true_alpha {
            self.start_mirror(schema.transparency);
        } else if schema.use_transparency {
            self.stop_mirror();
            if let Some(linked) = self.linked.as_mut() {
                linked.view.set_blend_color(schema.blend_color());
                linked.view.set_background(Background::Cleared);
            }
        } else {
            self.stop_mirror();
            self.refresh_background(false);
            if let Some(linked) = self.linked.as_mut() {
                linked.view.set_blend_color(image::Rgba([0, 0, 0, 0xff]));
            }
        }

        debug!("Schema {:?} applied", schema.name);
    }

    /// The session finished: destroy view and session, tell the parent
    /// there is nothing to reuse.
    pub fn end_session(&mut self) -> Result<(), WindowError> {
        self.latch(Lifecycle::Terminated)?;
        let state = self.lifecycle;
        let Linked { view, mut session } = self
            .linked
            .take()
            .ok_or(WindowError::StaleSession { state })?;

        session.set_connect(false);
        self.listeners.remove(Listeners::EMULATION);
        self.stop_mirror();

        drop(view);
        drop(session);
        self.listeners = Listeners::empty();
        self.window.close();

        info!("Session of window {} ended", self.id.0);
        self.notify_closed(None);
        Ok(())
    }

    /// Close the window but keep the session alive: hand view and session
    /// to the parent, then close only the shell.
    pub fn detach_for_reuse(&mut self) -> Result<(), WindowError> {
        self.latch(Lifecycle::Detached)?;
        let state = self.lifecycle;
        let Linked { view, mut session } = self
            .linked
            .take()
            .ok_or(WindowError::StaleSession { state })?;

        self.listeners.remove(Listeners::EMULATION);
        session.set_connect(false);
        self.stop_mirror();
        self.listeners = Listeners::empty();

        info!("Window {} detached, session handed back", self.id.0);
        self.notify_closed(Some(DetachedSession { view, session }));
        self.window.close();
        Ok(())
    }

    /// Forward a process-control signal to the session
    pub fn send_signal(&mut self, kind: SignalKind) -> Result<(), WindowError> {
        let state = self.lifecycle;
        let Some(linked) = self.linked.as_mut() else {
            warn!("Not sending {}: session of window {} is gone", kind.name(), self.id.0);
            return Err(WindowError::StaleSession { state });
        };
        linked.session.send_signal(signal_for(kind))?;
        Ok(())
    }

    /// Ask for a new session title; cancelling changes nothing
    pub fn rename_session(&mut self) -> Result<(), WindowError> {
        let state = self.lifecycle;
        let linked = self
            .linked
            .as_mut()
            .ok_or(WindowError::StaleSession { state })?;

        let current = linked.session.title();
        match self.prompt.get_text("Rename Session", "Session name:", &current) {
            Some(name) => {
                linked.session.set_title(&name);
                self.update_title();
            }
            None => debug!("Rename cancelled"),
        }
        Ok(())
    }

    /// Caption gets the full title, the icon the short one
    pub fn update_title(&mut self) {
        if let Some(linked) = self.linked.as_ref() {
            self.window.set_caption(&linked.session.full_title());
            self.window.set_icon_text(&linked.session.icon_text());
        }
    }

    pub fn id(&self) -> ChildId {
        self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn view(&self) -> Option<&V> {
        self.linked.as_ref().map(|linked| &linked.view)
    }

    /// Mutable view access for host-driven changes (drag, move)
    pub fn view_mut(&mut self) -> Option<&mut V> {
        self.linked.as_mut().map(|linked| &mut linked.view)
    }

    pub fn session(&self) -> Option<&S> {
        self.linked.as_ref().map(|linked| &linked.session)
    }

    pub fn session_mut(&mut self) -> Option<&mut S> {
        self.linked.as_mut().map(|linked| &mut linked.session)
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn listeners(&self) -> Listeners {
        self.listeners
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn mirror(&self) -> Option<&RootMirror> {
        self.mirror.as_ref()
    }

    pub fn wallpaper_state(&self) -> WallpaperState {
        self.tracker.state()
    }

    fn latch(&mut self, next: Lifecycle) -> Result<(), WindowError> {
        if self.lifecycle != Lifecycle::Active {
            error!(
                "Teardown of window {} to {:?} requested twice (already {:?})",
                self.id.0, next, self.lifecycle
            );
            return Err(WindowError::AlreadyClosed {
                state: self.lifecycle,
            });
        }
        self.lifecycle = next;
        Ok(())
    }

    fn notify_closed(&mut self, reusable: Option<DetachedSession<V, S>>) {
        let closed = WindowClosed {
            child: self.id,
            reusable,
        };
        if self.closed_tx.send(closed).is_err() {
            warn!("Parent of window {} is gone, closed notice dropped", self.id.0);
        }
    }

    /// Push the static background for the current schema and view size
    fn refresh_background(&mut self, force: bool) {
        if self.schema.use_transparency {
            // The mirror or the true-alpha blend owns the background
            self.repaint_mirror();
            return;
        }
        let Some(linked) = self.linked.as_mut() else {
            return;
        };

        if force {
            self.compositor.invalidate();
        }
        let fallback = linked.view.default_back_color();
        let composite = self.compositor.compose(
            &self.schema.image_path,
            self.schema.alignment,
            linked.view.pixel_size(),
            fallback,
        );
        let background = match composite {
            CompositedImage::Flat => Background::Color(fallback),
            CompositedImage::Tiled(image) => Background::Tiled(image),
            CompositedImage::Fitted(image) => Background::Fitted(image),
        };
        linked.view.set_background(background);
    }

    fn repaint_mirror(&mut self) {
        if let (Some(mirror), Some(linked)) = (self.mirror.as_mut(), self.linked.as_mut()) {
            mirror.repaint(self.desktop.as_ref(), &mut linked.view);
        }
    }

    /// Stop any running mirror and start a fresh one. The stopped handle
    /// is returned.
    fn start_mirror(&mut self, fade: Transparency) -> Option<RootMirror> {
        let previous = self.mirror.take().map(|mut previous| {
            previous.stop();
            previous
        });
        let linked = self.linked.as_mut()?;

        let mut mirror = RootMirror::new(fade);
        mirror.start(self.desktop.as_ref(), &mut linked.view);
        self.mirror = Some(mirror);
        if let Err(e) = self.tracker.resync(self.desktop.as_ref()) {
            warn!("Window {}: desktop query failed, background marked stale: {}", self.id.0, e);
            self.tracker.reset();
        }
        previous
    }

    fn stop_mirror(&mut self) {
        if let Some(mut mirror) = self.mirror.take() {
            mirror.stop();
        }
        self.tracker.reset();
    }

    fn on_background_changed(&mut self, desk: DesktopId) {
        self.compositor.bump_generation();
        if self.mirror.is_none() {
            return;
        }

        match self.tracker.background_changed(desk, self.desktop.as_ref()) {
            Ok(Repaint::Now) => self.repaint_mirror(),
            Ok(Repaint::Skip) => {}
            Err(e) => warn!("Desktop query failed after background change: {:#}", e),
        }
    }

    fn on_desktop_activated(&mut self, desk: DesktopId) {
        if self.mirror.is_none() {
            return;
        }

        match self.tracker.desktop_activated(desk, self.desktop.as_ref()) {
            Ok(Repaint::Now) => self.repaint_mirror(),
            Ok(Repaint::Skip) => {}
            Err(e) => warn!("Desktop query failed after switch to {}: {:#}", desk, e),
        }
    }

    fn enable_master_mode(&mut self) -> Result<(), WindowError> {
        let state = self.lifecycle;
        let linked = self
            .linked
            .as_mut()
            .ok_or(WindowError::StaleSession { state })?;
        linked.session.set_listen_to_key_press(true);
        Ok(())
    }

    fn show_menu(&mut self, x: i32, y: i32) {
        if let (Some(menu), Some(linked)) = (self.menu.as_ref(), self.linked.as_ref()) {
            let (gx, gy) = linked.view.map_to_global(x, y);
            self.window.show_menu_at(menu, gx, gy);
        }
    }

    fn activate(&mut self, action: MenuAction) -> Result<(), WindowError> {
        if !self.menu.as_ref().is_some_and(|menu| menu.offers(action)) {
            warn!("Menu action {:?} is not offered, ignoring", action);
            return Ok(());
        }

        match action {
            MenuAction::SelectionEnd | MenuAction::Copy | MenuAction::Paste => {
                let state = self.lifecycle;
                let view = &mut self
                    .linked
                    .as_mut()
                    .ok_or(WindowError::StaleSession { state })?
                    .view;
                match action {
                    MenuAction::SelectionEnd => view.set_selection_end(),
                    MenuAction::Copy => view.copy_clipboard(),
                    _ => view.paste_clipboard(),
                }
                Ok(())
            }
            MenuAction::SendSignal { signal } => self.send_signal(signal),
            MenuAction::AttachSession => self.detach_for_reuse(),
            MenuAction::RenameSession => self.rename_session(),
            MenuAction::CloseSession => {
                let state = self.lifecycle;
                self.linked
                    .as_mut()
                    .ok_or(WindowError::StaleSession { state })?
                    .session
                    .close_session();
                Ok(())
            }
        }
    }
}

impl<V, S, W> Drop for SessionWindowController<V, S, W>
where
    V: TerminalView,
    S: Session,
    W: HostWindow,
{
    fn drop(&mut self) {
        // Dropped while open: the session outlives the window
        if self.lifecycle == Lifecycle::Active {
            if let Err(e) = self.detach_for_reuse() {
                warn!("Window {} dropped without detaching: {}", self.id.0, e);
            }
        }
    }
}

#[cfg(test)]
mod tests;
