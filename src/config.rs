//! Configuration for termchild
//!
//! Loads configuration from TOML file at `~/.config/termchild/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::desktop::ALL_DESKTOPS;
use crate::schema::{Rgb, Schema};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub view: ViewOptions,
    pub schema: Schema,
    pub menu: MenuConfig,
    pub host: HostConfig,
    pub replay: ReplayConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist.
    /// An explicit path is never auto-generated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file {:?} does not exist", config_path);
            }
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("termchild");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string = toml::to_string_pretty(&default_config)
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Window geometry and resize policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Columns; 0 means the 80x24 default
    pub columns: u16,
    /// Lines; 0 means the 80x24 default
    pub lines: u16,
    /// Lock the view and window to the requested size
    pub fixed_size: bool,
    /// Let programs in the session change the column count
    pub allow_resize_from_session: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            columns: 0,
            lines: 0,
            fixed_size: false,
            allow_resize_from_session: true,
        }
    }
}

/// Scrollbar placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollbarLocation {
    Hidden,
    Left,
    #[default]
    Right,
}

/// View frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStyle {
    None,
    #[default]
    Sunken,
}

/// What the view does on BEL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BellMode {
    #[default]
    System,
    Notify,
    Visible,
    None,
}

/// Terminal font
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub point_size: f32,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Monospace".to_string(),
            point_size: 10.0,
        }
    }
}

/// Options applied to the terminal view when the window is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub font: Font,
    pub bell_mode: BellMode,
    /// Characters treated as part of a word on double-click selection
    pub word_characters: String,
    pub blinking_cursor: bool,
    pub ctrl_drag: bool,
    /// Show the size overlay while resizing
    pub terminal_size_hint: bool,
    pub line_spacing: u32,
    pub cut_to_beginning_of_line: bool,
    pub scrollbar: ScrollbarLocation,
    pub frame_style: FrameStyle,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            font: Font::default(),
            bell_mode: BellMode::default(),
            word_characters: ":@-./_~".to_string(),
            blinking_cursor: false,
            ctrl_drag: true,
            terminal_size_hint: false,
            line_spacing: 0,
            cut_to_beginning_of_line: false,
            scrollbar: ScrollbarLocation::default(),
            frame_style: FrameStyle::default(),
        }
    }
}

/// Context menu authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Right-button menu allowed at all
    pub enabled: bool,
    /// Send-signal submenu allowed
    pub send_signal: bool,
    /// Add a tear-off handle
    pub tear_off: bool,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            send_signal: true,
            tear_off: false,
        }
    }
}

/// Host display capabilities and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Display has a true-alpha visual (per-pixel blending)
    pub true_alpha: bool,
    /// Character cell width in pixels
    pub cell_width: u32,
    /// Character cell height in pixels
    pub cell_height: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            true_alpha: false,
            cell_width: 8,
            cell_height: 16,
        }
    }
}

/// Headless desktop used when replaying an event script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Desktop of the window (`4294967295` = all desktops)
    pub window_desktop: u32,
    /// Desktop active at start
    pub current_desktop: u32,
    /// Desktop background color when no image is set
    pub root_color: Rgb,
    /// Desktop background image
    pub root_image: Option<PathBuf>,
    /// Session title
    pub title: String,
    /// Process that receives forwarded signals
    pub session_pid: Option<i32>,
    /// Answers to rename prompts, in order; once used up, renames are cancelled
    pub rename_answers: Vec<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            window_desktop: 0,
            current_desktop: 0,
            root_color: Rgb(0x2e, 0x34, 0x40),
            root_image: None,
            title: "Shell".to_string(),
            session_pid: None,
            rename_answers: Vec::new(),
        }
    }
}

impl ReplayConfig {
    pub fn is_sticky(&self) -> bool {
        self.window_desktop == ALL_DESKTOPS
    }
}
