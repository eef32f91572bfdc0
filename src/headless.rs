//! Headless host
//!
//! In-memory implementations of the host collaborators. They keep enough
//! state to be inspected afterwards, which makes them the host for the
//! tests and for replaying event scripts without a display.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info};

use crate::config::ViewOptions;
use crate::desktop::{copy_wrapped, Desktop, DesktopId, DesktopPlacement};
use crate::geometry::{PixelSize, Rect, TermSize};
use crate::host::{Background, HostWindow, Session, TerminalView, TextPrompt};
use crate::menu::ContextMenu;
use crate::schema::{ColorEntry, Rgb, DEFAULT_BACK_COLOR, DEFAULT_TABLE};

// ============================================================================
// View
// ============================================================================

/// Counters for clipboard actions routed to the view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipboardLog {
    pub selection_ends: u32,
    pub copies: u32,
    pub pastes: u32,
}

/// Terminal view that lays out a fixed-size character cell grid
#[derive(Debug)]
pub struct HeadlessView {
    cell: PixelSize,
    size: TermSize,
    fixed: bool,
    /// Pixel size set by a user drag, until the next programmatic resize
    dragged: Option<PixelSize>,
    minimum: PixelSize,
    origin: (i32, i32),
    options: Option<ViewOptions>,
    size_startup: bool,
    focused: bool,
    color_table: Vec<ColorEntry>,
    color_table_sets: u32,
    background: Background,
    background_sets: u32,
    blend: Rgba<u8>,
    updates: u32,
    clipboard: ClipboardLog,
}

impl HeadlessView {
    pub fn new(cell: PixelSize) -> Self {
        Self {
            cell,
            size: TermSize::default(),
            fixed: false,
            dragged: None,
            minimum: PixelSize::default(),
            origin: (0, 0),
            options: None,
            size_startup: true,
            focused: false,
            color_table: DEFAULT_TABLE.to_vec(),
            color_table_sets: 0,
            background: Background::Color(DEFAULT_TABLE[DEFAULT_BACK_COLOR].color),
            background_sets: 0,
            blend: Rgba([0, 0, 0, 0xff]),
            updates: 0,
            clipboard: ClipboardLog::default(),
        }
    }

    /// Resize by dragging; ignored while the size is locked
    pub fn drag_to(&mut self, size: PixelSize) {
        if self.fixed {
            debug!("View size is fixed, ignoring drag to {:?}", size);
            return;
        }
        self.size = TermSize::new(
            (size.width / self.cell.width.max(1)) as u16,
            (size.height / self.cell.height.max(1)) as u16,
        );
        self.dragged = Some(size);
    }

    /// Position of the view's top-left corner on screen
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.origin = (x, y);
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn options(&self) -> Option<&ViewOptions> {
        self.options.as_ref()
    }

    pub fn minimum_size(&self) -> PixelSize {
        self.minimum
    }

    pub fn shows_size_at_startup(&self) -> bool {
        self.size_startup
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn color_table(&self) -> &[ColorEntry] {
        &self.color_table
    }

    pub fn color_table_sets(&self) -> u32 {
        self.color_table_sets
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Number of times a background was pushed
    pub fn background_sets(&self) -> u32 {
        self.background_sets
    }

    pub fn blend_color(&self) -> Rgba<u8> {
        self.blend
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }

    pub fn clipboard(&self) -> ClipboardLog {
        self.clipboard
    }

    /// Render what the view paints behind its text
    pub fn render_background(&self) -> RgbaImage {
        let size = self.pixel_size();
        match &self.background {
            Background::Color(color) => RgbaImage::from_pixel(size.width, size.height, color.opaque()),
            Background::Tiled(tile) if tile.width() > 0 && tile.height() > 0 => {
                RgbaImage::from_fn(size.width, size.height, |x, y| {
                    *tile.get_pixel(x % tile.width(), y % tile.height())
                })
            }
            Background::Tiled(_) => RgbaImage::from_pixel(
                size.width,
                size.height,
                self.default_back_color().opaque(),
            ),
            Background::Fitted(image) => image.as_ref().clone(),
            Background::Cleared => RgbaImage::from_pixel(size.width, size.height, self.blend),
        }
    }

    /// Write the rendered background as PNG
    pub fn save_background(&self, path: &Path) -> Result<()> {
        self.render_background()
            .save(path)
            .with_context(|| format!("Failed to write background to {:?}", path))
    }
}

impl TerminalView for HeadlessView {
    fn apply_options(&mut self, options: &ViewOptions) {
        self.options = Some(options.clone());
    }

    fn set_minimum_size(&mut self, size: PixelSize) {
        self.minimum = size;
    }

    fn set_terminal_size_startup(&mut self, show: bool) {
        self.size_startup = show;
    }

    fn set_focus(&mut self) {
        self.focused = true;
    }

    fn set_size(&mut self, size: TermSize) {
        self.size = size;
        self.fixed = false;
        self.dragged = None;
    }

    fn set_fixed_size(&mut self, size: TermSize) {
        self.size = size;
        self.fixed = true;
        self.dragged = None;
    }

    fn term_size(&self) -> TermSize {
        self.size
    }

    fn pixel_size(&self) -> PixelSize {
        let natural = self.dragged.unwrap_or(PixelSize::new(
            u32::from(self.size.columns) * self.cell.width,
            u32::from(self.size.lines) * self.cell.height,
        ));
        PixelSize::new(
            natural.width.max(self.minimum.width),
            natural.height.max(self.minimum.height),
        )
    }

    fn set_color_table(&mut self, table: &[ColorEntry]) {
        self.color_table = table.to_vec();
        self.color_table_sets += 1;
    }

    fn default_back_color(&self) -> Rgb {
        self.color_table
            .get(DEFAULT_BACK_COLOR)
            .unwrap_or(&DEFAULT_TABLE[DEFAULT_BACK_COLOR])
            .color
    }

    fn set_background(&mut self, background: Background) {
        self.background = background;
        self.background_sets += 1;
    }

    fn set_blend_color(&mut self, color: Rgba<u8>) {
        self.blend = color;
    }

    fn update(&mut self) {
        self.updates += 1;
    }

    fn set_selection_end(&mut self) {
        self.clipboard.selection_ends += 1;
    }

    fn copy_clipboard(&mut self) {
        self.clipboard.copies += 1;
    }

    fn paste_clipboard(&mut self) {
        self.clipboard.pastes += 1;
    }

    fn map_to_global(&self, x: i32, y: i32) -> (i32, i32) {
        (self.origin.0 + x, self.origin.1 + y)
    }
}

// ============================================================================
// Window
// ============================================================================

/// Window shell with a constant decoration size around the view
#[derive(Debug)]
pub struct HeadlessWindow {
    decoration: PixelSize,
    hint: PixelSize,
    size: PixelSize,
    fixed: Option<PixelSize>,
    caption: String,
    icon_text: String,
    menus: Vec<(i32, i32)>,
    closed: bool,
}

impl HeadlessWindow {
    pub fn new(decoration: PixelSize) -> Self {
        Self {
            decoration,
            hint: decoration,
            size: decoration,
            fixed: None,
            caption: String::new(),
            icon_text: String::new(),
            menus: Vec::new(),
            closed: false,
        }
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn icon_text(&self) -> &str {
        &self.icon_text
    }

    pub fn fixed_size(&self) -> Option<PixelSize> {
        self.fixed
    }

    /// Screen positions the menu was shown at
    pub fn menus_shown(&self) -> &[(i32, i32)] {
        &self.menus
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl HostWindow for HeadlessWindow {
    fn set_caption(&mut self, caption: &str) {
        self.caption = caption.to_string();
    }

    fn set_icon_text(&mut self, text: &str) {
        self.icon_text = text.to_string();
    }

    fn adjust_size(&mut self, view: PixelSize) {
        self.hint = PixelSize::new(
            view.width + self.decoration.width,
            view.height + self.decoration.height,
        );
        if self.fixed.is_none() {
            self.size = self.hint;
        }
    }

    fn size_hint(&self) -> PixelSize {
        self.hint
    }

    fn set_fixed_size(&mut self, size: PixelSize) {
        self.fixed = Some(size);
        self.size = size;
    }

    fn size(&self) -> PixelSize {
        self.size
    }

    fn show_menu_at(&mut self, menu: &ContextMenu, x: i32, y: i32) {
        debug!("Menu with {} entries at ({}, {})", menu.entries.len(), x, y);
        self.menus.push((x, y));
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

// ============================================================================
// Session
// ============================================================================

/// Session without a terminal; signals go to `pid` when one is given
#[derive(Debug)]
pub struct HeadlessSession {
    title: String,
    program_title: Option<String>,
    pid: Option<Pid>,
    connected: bool,
    listens_to_key_press: bool,
    close_requested: bool,
    signals: Vec<Signal>,
}

impl HeadlessSession {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            program_title: None,
            pid: None,
            connected: false,
            listens_to_key_press: false,
            close_requested: false,
            signals: Vec::new(),
        }
    }

    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(Pid::from_raw(pid));
        self
    }

    /// Title set by the program running in the session
    pub fn set_program_title(&mut self, title: &str) {
        self.program_title = Some(title.to_string());
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn listens_to_key_press(&self) -> bool {
        self.listens_to_key_press
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }
}

impl Session for HeadlessSession {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn full_title(&self) -> String {
        match &self.program_title {
            Some(program) if !program.is_empty() => format!("{} - {}", self.title, program),
            _ => self.title.clone(),
        }
    }

    fn icon_text(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_connect(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn set_listen_to_key_press(&mut self, listen: bool) {
        self.listens_to_key_press = listen;
    }

    fn send_signal(&mut self, sig: Signal) -> Result<()> {
        if let Some(pid) = self.pid {
            signal::kill(pid, sig)
                .with_context(|| format!("Failed to send {} to {}", sig, pid))?;
            info!("Sent {} to {}", sig, pid);
        }
        self.signals.push(sig);
        Ok(())
    }

    fn close_session(&mut self) {
        self.close_requested = true;
    }
}

// ============================================================================
// Prompt
// ============================================================================

/// Prompt that answers from a queue; an empty queue cancels
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<Option<String>>,
}

impl ScriptedPrompt {
    pub fn new<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            answers: answers.into_iter().collect(),
        }
    }
}

impl TextPrompt for ScriptedPrompt {
    fn get_text(&mut self, caption: &str, label: &str, initial: &str) -> Option<String> {
        let answer = self.answers.pop_front().flatten();
        debug!("{} / {} [{}] -> {:?}", caption, label, initial, answer);
        answer
    }
}

// ============================================================================
// Desktop
// ============================================================================

#[derive(Debug)]
enum RootPicture {
    Color(Rgb),
    Image(RgbaImage),
}

#[derive(Debug)]
struct DesktopModel {
    window: DesktopPlacement,
    current: DesktopId,
    root: RootPicture,
    snapshots: u32,
}

/// Desktop whose state is set by the caller. Clones share state, so the
/// caller keeps a handle after giving one to the controller.
#[derive(Debug, Clone)]
pub struct ScriptedDesktop {
    model: Rc<RefCell<DesktopModel>>,
}

impl ScriptedDesktop {
    pub fn new(window: DesktopPlacement, current: DesktopId) -> Self {
        Self {
            model: Rc::new(RefCell::new(DesktopModel {
                window,
                current,
                root: RootPicture::Color(Rgb(0, 0, 0)),
                snapshots: 0,
            })),
        }
    }

    pub fn set_current(&self, desktop: DesktopId) {
        self.model.borrow_mut().current = desktop;
    }

    pub fn set_root_color(&self, color: Rgb) {
        self.model.borrow_mut().root = RootPicture::Color(color);
    }

    /// Root background image, repeated across the screen
    pub fn set_root_image(&self, image: RgbaImage) {
        self.model.borrow_mut().root = RootPicture::Image(image);
    }

    /// Number of root snapshots taken
    pub fn snapshots(&self) -> u32 {
        self.model.borrow().snapshots
    }
}

impl Desktop for ScriptedDesktop {
    fn window_desktop(&self) -> Result<DesktopPlacement> {
        Ok(self.model.borrow().window)
    }

    fn current_desktop(&self) -> Result<DesktopId> {
        Ok(self.model.borrow().current)
    }

    fn root_snapshot(&self, area: Rect) -> Result<RgbaImage> {
        let mut model = self.model.borrow_mut();
        model.snapshots += 1;
        let picture = match &model.root {
            RootPicture::Color(color) => RgbaImage::from_pixel(area.width, area.height, color.opaque()),
            RootPicture::Image(root) => copy_wrapped(root, area)?,
        };
        Ok(picture)
    }
}
