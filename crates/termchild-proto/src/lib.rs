//! termchild wire protocol
//!
//! Shared message types for driving a detached session window: the events a
//! window consumes from its session, the desktop and the user, and the
//! notices it reports back to whoever owns it.

use serde::{Deserialize, Serialize};

// ============================================================================
// Inputs → Window
// ============================================================================

/// Events delivered to a session window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WindowEvent {
    /// The session finished (process exited or was closed)
    SessionDone,

    /// The session's title changed
    SessionTitleChanged,

    /// The session was renamed from elsewhere
    SessionRenamed { title: String },

    /// Keystrokes should be broadcast to other sessions
    MasterModeEnabled,

    /// The emulation resized its image
    ImageSizeChanged { lines: u16, columns: u16 },

    /// The program in the session asked for a column count
    ColumnsChanged { columns: u16 },

    /// The desktop background changed on a virtual desktop
    BackgroundChanged { desktop: u32 },

    /// A virtual desktop became the active one
    DesktopActivated { desktop: u32 },

    /// Right button pressed on the view at view-local coordinates
    ConfigureRequest { x: i32, y: i32 },

    /// The window moved on screen
    WindowMoved { x: i32, y: i32 },

    /// A context menu entry was chosen
    Menu { action: MenuAction },
}

/// Context menu actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum MenuAction {
    SelectionEnd,
    Copy,
    Paste,
    SendSignal { signal: SignalKind },
    AttachSession,
    RenameSession,
    CloseSession,
}

/// Process-control signals offered by the send-signal menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Stop,
    Cont,
    Hup,
    Int,
    Term,
    Kill,
    Usr1,
    Usr2,
}

impl SignalKind {
    /// Menu order
    pub const ALL: [SignalKind; 8] = [
        SignalKind::Stop,
        SignalKind::Cont,
        SignalKind::Hup,
        SignalKind::Int,
        SignalKind::Term,
        SignalKind::Kill,
        SignalKind::Usr1,
        SignalKind::Usr2,
    ];

    /// Short signal name as shown in menus ("STOP", "USR1", ...)
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Stop => "STOP",
            SignalKind::Cont => "CONT",
            SignalKind::Hup => "HUP",
            SignalKind::Int => "INT",
            SignalKind::Term => "TERM",
            SignalKind::Kill => "KILL",
            SignalKind::Usr1 => "USR1",
            SignalKind::Usr2 => "USR2",
        }
    }
}

// ============================================================================
// Window → Owner
// ============================================================================

/// Notices reported by a session window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChildNotice {
    /// Caption and icon text were recomposed
    TitleChanged { caption: String, icon_text: String },

    /// A new background was pushed to the view
    BackgroundUpdated {
        kind: BackgroundKind,
        width: u32,
        height: u32,
    },

    /// The window closed; `reusable` is true when the view and session were
    /// handed back instead of destroyed
    WindowClosed { child: u64, reusable: bool },
}

/// What kind of background the view is painting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    Color,
    Tiled,
    Fitted,
    Cleared,
}

// ============================================================================
// Line Framing
// ============================================================================

/// Encode a message as one JSON line (terminated by `\n`)
pub fn encode_line<T: Serialize>(msg: &T) -> anyhow::Result<String> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}

/// Decode a window event from one line. Blank lines and `#` comments yield `None`.
pub fn decode_event(line: &str) -> anyhow::Result<Option<WindowEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}
