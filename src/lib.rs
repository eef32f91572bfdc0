//! termchild
//!
//! Controller for a detachable terminal-session window: geometry, color
//! schema and background (static image or mirrored desktop), desktop
//! tracking, the context menu and the teardown handshake with the owner.

pub mod background;
pub mod config;
pub mod controller;
pub mod desktop;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod menu;
pub mod mirror;
pub mod schema;
pub mod x11;

pub use controller::{
    ChildId, Collaborators, DetachedSession, Lifecycle, SessionWindowController, WindowClosed,
    WindowError, WindowOptions, WindowParts,
};
