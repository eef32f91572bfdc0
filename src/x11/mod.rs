//! X11 desktop backend
//!
//! Answers desktop queries from EWMH properties, snapshots the root
//! background pixmap and turns root property changes into window events.

pub mod atoms;
pub mod desktop;
pub mod events;

pub use atoms::Atoms;
pub use desktop::X11Desktop;
pub use events::DesktopEventStream;
