//! Color schemas
//!
//! A schema bundles the terminal palette with the background configuration:
//! placement mode, image path and transparency. Schemas are replaced whole,
//! never edited in place, so the controller holds them behind an `Arc`.

use std::path::PathBuf;

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Number of entries in a terminal color table
pub const TABLE_COLORS: usize = 20;

/// Index of the default background color in the table
pub const DEFAULT_BACK_COLOR: usize = 1;

/// 8-bit RGB color, serialized as `[r, g, b]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn opaque(self) -> Rgba<u8> {
        Rgba([self.0, self.1, self.2, 0xff])
    }

    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.0, self.1, self.2, alpha])
    }
}

/// Background image placement
///
/// The numeric codes are ordered: everything from `Center` upward depends on
/// the view size and must be recomposed when the view resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    None = 1,
    Tile = 2,
    Center = 3,
    Scale = 4,
}

impl Alignment {
    /// True if the composited image depends on the view size
    pub fn follows_size(self) -> bool {
        self >= Alignment::Center
    }
}

/// One palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub color: Rgb,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub bold: bool,
}

impl ColorEntry {
    const fn new(r: u8, g: u8, b: u8, transparent: bool, bold: bool) -> Self {
        Self {
            color: Rgb(r, g, b),
            transparent,
            bold,
        }
    }
}

/// Pseudo-transparency parameters: the desktop background is blended toward
/// `tint` by `fade` (0.0 = untouched, 1.0 = solid tint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transparency {
    pub fade: f32,
    pub tint: Rgb,
}

impl Default for Transparency {
    fn default() -> Self {
        Self {
            fade: 0.5,
            tint: Rgb(0, 0, 0),
        }
    }
}

/// Color schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub name: String,
    pub alignment: Alignment,
    /// Background image; empty means none
    pub image_path: PathBuf,
    pub use_transparency: bool,
    pub transparency: Transparency,
    pub table: Vec<ColorEntry>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            alignment: Alignment::None,
            image_path: PathBuf::new(),
            use_transparency: false,
            transparency: Transparency::default(),
            table: DEFAULT_TABLE.to_vec(),
        }
    }
}

impl Schema {
    /// Blend color handed to a true-alpha view: the tint with the fade as alpha
    pub fn blend_color(&self) -> Rgba<u8> {
        let alpha = (self.transparency.fade.clamp(0.0, 1.0) * 255.0) as u8;
        self.transparency.tint.with_alpha(alpha)
    }
}

/// Built-in palette: foreground, background, 8 normal colors, intense
/// foreground, intense background, 8 intense colors.
pub const DEFAULT_TABLE: [ColorEntry; TABLE_COLORS] = [
    ColorEntry::new(0x00, 0x00, 0x00, false, false),
    ColorEntry::new(0xff, 0xff, 0xff, true, false),
    ColorEntry::new(0x00, 0x00, 0x00, false, false),
    ColorEntry::new(0xb2, 0x18, 0x18, false, false),
    ColorEntry::new(0x18, 0xb2, 0x18, false, false),
    ColorEntry::new(0xb2, 0x68, 0x18, false, false),
    ColorEntry::new(0x18, 0x18, 0xb2, false, false),
    ColorEntry::new(0xb2, 0x18, 0xb2, false, false),
    ColorEntry::new(0x18, 0xb2, 0xb2, false, false),
    ColorEntry::new(0xb2, 0xb2, 0xb2, false, false),
    ColorEntry::new(0x00, 0x00, 0x00, false, true),
    ColorEntry::new(0xff, 0xff, 0xff, true, false),
    ColorEntry::new(0x68, 0x68, 0x68, false, false),
    ColorEntry::new(0xff, 0x54, 0x54, false, false),
    ColorEntry::new(0x54, 0xff, 0x54, false, false),
    ColorEntry::new(0xff, 0xff, 0x54, false, false),
    ColorEntry::new(0x54, 0x54, 0xff, false, false),
    ColorEntry::new(0xff, 0x54, 0xff, false, false),
    ColorEntry::new(0x54, 0xff, 0xff, false, false),
    ColorEntry::new(0xff, 0xff, 0xff, false, false),
];
