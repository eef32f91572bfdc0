//! Host collaborators
//!
//! The window controller never touches a toolkit directly. It drives the
//! terminal view, the window shell, the session and the text prompt through
//! these narrow interfaces; the host (a real toolkit, or the headless
//! implementation in [`crate::headless`]) provides them.

use std::sync::Arc;

use anyhow::Result;
use image::{Rgba, RgbaImage};
use nix::sys::signal::Signal;
use termchild_proto::{BackgroundKind, SignalKind};

use crate::config::ViewOptions;
use crate::geometry::{PixelSize, TermSize};
use crate::menu::ContextMenu;
use crate::schema::{ColorEntry, Rgb};

/// Display capabilities, decided once by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    /// Per-pixel alpha blending is available; no root mirroring needed
    pub true_alpha: bool,
}

/// What the view paints behind the text
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    /// Solid color
    Color(Rgb),
    /// Image repeated across the view
    Tiled(Arc<RgbaImage>),
    /// Image covering the view exactly
    Fitted(Arc<RgbaImage>),
    /// No image; a true-alpha view blends with what is behind the window
    Cleared,
}

impl Background {
    pub fn kind(&self) -> BackgroundKind {
        match self {
            Background::Color(_) => BackgroundKind::Color,
            Background::Tiled(_) => BackgroundKind::Tiled,
            Background::Fitted(_) => BackgroundKind::Fitted,
            Background::Cleared => BackgroundKind::Cleared,
        }
    }
}

/// Terminal view widget
pub trait TerminalView {
    fn apply_options(&mut self, options: &ViewOptions);
    fn set_minimum_size(&mut self, size: PixelSize);
    /// Show the size overlay when the view first appears
    fn set_terminal_size_startup(&mut self, show: bool);
    fn set_focus(&mut self);

    /// Natural size: the view prefers `size` but may be resized
    fn set_size(&mut self, size: TermSize);
    /// Locked size: the view is exactly `size`
    fn set_fixed_size(&mut self, size: TermSize);
    fn term_size(&self) -> TermSize;
    fn pixel_size(&self) -> PixelSize;

    fn set_color_table(&mut self, table: &[ColorEntry]);
    fn default_back_color(&self) -> Rgb;
    fn set_background(&mut self, background: Background);
    fn set_blend_color(&mut self, color: Rgba<u8>);
    /// Schedule a redraw
    fn update(&mut self);

    fn set_selection_end(&mut self);
    fn copy_clipboard(&mut self);
    fn paste_clipboard(&mut self);

    /// View-local point to root coordinates
    fn map_to_global(&self, x: i32, y: i32) -> (i32, i32);
}

/// Top-level window around the view
pub trait HostWindow {
    fn set_caption(&mut self, caption: &str);
    fn set_icon_text(&mut self, text: &str);
    /// Resize the window to fit its view
    fn adjust_size(&mut self, view: PixelSize);
    fn size_hint(&self) -> PixelSize;
    fn set_fixed_size(&mut self, size: PixelSize);
    fn size(&self) -> PixelSize;
    fn show_menu_at(&mut self, menu: &ContextMenu, x: i32, y: i32);
    /// Destroy the window shell (not the view)
    fn close(&mut self);
}

/// Terminal session (process plus emulation)
pub trait Session {
    fn title(&self) -> String;
    /// Caption text: user title and program title combined
    fn full_title(&self) -> String;
    fn icon_text(&self) -> String;
    fn set_title(&mut self, title: &str);
    /// Route emulation output to the bound view
    fn set_connect(&mut self, connected: bool);
    fn set_listen_to_key_press(&mut self, listen: bool);
    fn send_signal(&mut self, signal: Signal) -> Result<()>;
    /// Ask the session to end; completion arrives later as `SessionDone`
    fn close_session(&mut self);
}

/// Modal single-line text input
pub trait TextPrompt {
    /// `None` when cancelled
    fn get_text(&mut self, caption: &str, label: &str, initial: &str) -> Option<String>;
}

/// Signal delivered for a send-signal menu entry
pub fn signal_for(kind: SignalKind) -> Signal {
    match kind {
        SignalKind::Stop => Signal::SIGSTOP,
        SignalKind::Cont => Signal::SIGCONT,
        SignalKind::Hup => Signal::SIGHUP,
        SignalKind::Int => Signal::SIGINT,
        SignalKind::Term => Signal::SIGTERM,
        SignalKind::Kill => Signal::SIGKILL,
        SignalKind::Usr1 => Signal::SIGUSR1,
        SignalKind::Usr2 => Signal::SIGUSR2,
    }
}
