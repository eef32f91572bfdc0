//! View geometry
//!
//! Terminal grid size and the pixel size it occupies.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COLUMNS: u16 = 80;
pub const DEFAULT_LINES: u16 = 24;

/// Terminal grid size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermSize {
    pub columns: u16,
    pub lines: u16,
}

impl TermSize {
    pub fn new(columns: u16, lines: u16) -> Self {
        Self { columns, lines }
    }

    /// The requested size, or 80x24 if either dimension is zero
    pub fn or_default(columns: u16, lines: u16) -> Self {
        if columns == 0 || lines == 0 {
            Self::default()
        } else {
            Self { columns, lines }
        }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            lines: DEFAULT_LINES,
        }
    }
}

/// Size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Screen rectangle (root window coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}
