//! Root background mirroring
//!
//! Pseudo-transparency for displays without a true-alpha visual: the desktop
//! background under the window is copied, faded toward the schema tint and
//! painted as the view background. The mirror is a handle; at most one is
//! live per window and it must be stopped before a new one starts.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::background::fade;
use crate::desktop::Desktop;
use crate::geometry::Rect;
use crate::host::{Background, TerminalView};
use crate::schema::Transparency;

/// Live root-background mirror
#[derive(Debug)]
pub struct RootMirror {
    fade: Transparency,
    running: bool,
    repaints: u64,
}

impl RootMirror {
    pub fn new(fade: Transparency) -> Self {
        Self {
            fade,
            running: false,
            repaints: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of pictures pushed to the view since start
    pub fn repaints(&self) -> u64 {
        self.repaints
    }

    /// Start mirroring and paint the first picture
    pub fn start(&mut self, desktop: &dyn Desktop, view: &mut dyn TerminalView) {
        info!(
            "Starting root background mirror (fade {:.2})",
            self.fade.fade
        );
        self.running = true;
        self.repaints = 0;
        self.repaint(desktop, view);
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!("Stopping root background mirror");
        }
        self.running = false;
    }

    /// Copy the desktop background under the view and push it, faded
    pub fn repaint(&mut self, desktop: &dyn Desktop, view: &mut dyn TerminalView) {
        if !self.running {
            return;
        }

        let size = view.pixel_size();
        if size.is_empty() {
            debug!("View has no area, skipping mirror repaint");
            return;
        }

        let (x, y) = view.map_to_global(0, 0);
        let area = Rect::new(x, y, size.width, size.height);
        match desktop.root_snapshot(area) {
            Ok(mut picture) => {
                fade(&mut picture, self.fade.fade, self.fade.tint);
                view.set_background(Background::Fitted(Arc::new(picture)));
                self.repaints += 1;
            }
            Err(e) => {
                warn!("Failed to copy desktop background at {:?}: {:#}", area, e);
                view.set_background(Background::Color(view.default_back_color()));
            }
        }
    }
}
