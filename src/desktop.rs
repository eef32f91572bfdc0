//! Desktop visibility tracking
//!
//! A pseudo-transparent window mirrors the desktop background behind it, so
//! its picture goes stale whenever the background of its desktop changes.
//! Repainting while the desktop is not shown is wasted work: instead the
//! tracker marks the picture stale and repaints exactly once when the
//! window's desktop is next activated.

use std::fmt;

use anyhow::Result;
use image::RgbaImage;
use tracing::{debug, trace};

use crate::geometry::Rect;

/// Special desktop value for sticky windows (all desktops), as in `_NET_WM_DESKTOP`
pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// Virtual desktop index (0-based, EWMH numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DesktopId(pub u32);

impl fmt::Display for DesktopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Desktop a window is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopPlacement {
    Desktop(DesktopId),
    AllDesktops,
}

impl DesktopPlacement {
    pub fn from_raw(value: u32) -> Self {
        if value == ALL_DESKTOPS {
            DesktopPlacement::AllDesktops
        } else {
            DesktopPlacement::Desktop(DesktopId(value))
        }
    }

    pub fn is_on(&self, desktop: DesktopId) -> bool {
        *self == DesktopPlacement::Desktop(desktop)
    }
}

/// Desktop collaborator: window placement, the active desktop and the
/// desktop background under a screen area.
pub trait Desktop {
    /// Desktop this window is assigned to
    fn window_desktop(&self) -> Result<DesktopPlacement>;

    /// Currently active desktop
    fn current_desktop(&self) -> Result<DesktopId>;

    /// Copy of the desktop background under `area`
    fn root_snapshot(&self, area: Rect) -> Result<RgbaImage>;
}

/// Which desktop the mirrored background is known to be current for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallpaperState {
    /// No up-to-date background for any desktop
    #[default]
    Stale,
    Fresh(DesktopId),
}

/// Whether the caller owes the view a repaint
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repaint {
    Now,
    Skip,
}

/// Copy `area` out of a root background that repeats across the screen
pub fn copy_wrapped(root: &RgbaImage, area: Rect) -> Result<RgbaImage> {
    let (w, h) = (i64::from(root.width()), i64::from(root.height()));
    anyhow::ensure!(w > 0 && h > 0, "root background is empty");
    Ok(RgbaImage::from_fn(area.width, area.height, |x, y| {
        let rx = (i64::from(area.x) + i64::from(x)).rem_euclid(w);
        let ry = (i64::from(area.y) + i64::from(y)).rem_euclid(h);
        *root.get_pixel(rx as u32, ry as u32)
    }))
}

/// Decides when the mirrored background must be repainted
#[derive(Debug, Default)]
pub struct DesktopVisibilityTracker {
    state: WallpaperState,
}

impl DesktopVisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WallpaperState {
        self.state
    }

    /// Forget what the mirror last showed
    pub fn reset(&mut self) {
        self.state = WallpaperState::Stale;
    }

    /// Match the state to a picture that was just taken. It is fresh only
    /// when the window's own desktop is the active one.
    pub fn resync(&mut self, desktop: &dyn Desktop) -> Result<()> {
        self.state = match desktop.window_desktop()? {
            DesktopPlacement::Desktop(ours) if desktop.current_desktop()? == ours => {
                WallpaperState::Fresh(ours)
            }
            _ => WallpaperState::Stale,
        };
        trace!("Tracker resynced to {:?}", self.state);
        Ok(())
    }

    /// The desktop background changed on `desk`
    pub fn background_changed(&mut self, desk: DesktopId, desktop: &dyn Desktop) -> Result<Repaint> {
        let placement = desktop.window_desktop()?;
        if !placement.is_on(desk) {
            trace!("Background changed on desktop {}, not ours", desk);
            return Ok(Repaint::Skip);
        }

        if desktop.current_desktop()? == desk {
            debug!("Background changed on visible desktop {}, repainting", desk);
            self.state = WallpaperState::Fresh(desk);
            Ok(Repaint::Now)
        } else {
            debug!("Background changed on hidden desktop {}, deferring", desk);
            self.state = WallpaperState::Stale;
            Ok(Repaint::Skip)
        }
    }

    /// `desk` became the active desktop
    pub fn desktop_activated(&mut self, desk: DesktopId, desktop: &dyn Desktop) -> Result<Repaint> {
        match desktop.window_desktop()? {
            DesktopPlacement::AllDesktops => {
                trace!("Sticky window, repainting for desktop {}", desk);
                Ok(Repaint::Now)
            }
            DesktopPlacement::Desktop(ours)
                if ours == desk && self.state != WallpaperState::Fresh(desk) =>
            {
                debug!("Desktop {} shown with stale background, repainting", desk);
                self.state = WallpaperState::Fresh(desk);
                Ok(Repaint::Now)
            }
            DesktopPlacement::Desktop(_) => Ok(Repaint::Skip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeDesktop {
        window: DesktopPlacement,
        current: DesktopId,
        current_queries: Cell<u32>,
    }

    impl FakeDesktop {
        fn new(window: DesktopPlacement, current: u32) -> Self {
            Self {
                window,
                current: DesktopId(current),
                current_queries: Cell::new(0),
            }
        }
    }

    impl Desktop for FakeDesktop {
        fn window_desktop(&self) -> Result<DesktopPlacement> {
            Ok(self.window)
        }

        fn current_desktop(&self) -> Result<DesktopId> {
            self.current_queries.set(self.current_queries.get() + 1);
            Ok(self.current)
        }

        fn root_snapshot(&self, area: Rect) -> Result<RgbaImage> {
            Ok(RgbaImage::new(area.width, area.height))
        }
    }

    struct BrokenDesktop;

    impl Desktop for BrokenDesktop {
        fn window_desktop(&self) -> Result<DesktopPlacement> {
            anyhow::bail!("window is gone")
        }

        fn current_desktop(&self) -> Result<DesktopId> {
            anyhow::bail!("window is gone")
        }

        fn root_snapshot(&self, _area: Rect) -> Result<RgbaImage> {
            anyhow::bail!("window is gone")
        }
    }

    fn on(desk: u32) -> DesktopPlacement {
        DesktopPlacement::Desktop(DesktopId(desk))
    }

    #[test]
    fn background_change_elsewhere_is_ignored() {
        let desktop = FakeDesktop::new(on(1), 1);
        let mut tracker = DesktopVisibilityTracker::new();

        let repaint = tracker.background_changed(DesktopId(3), &desktop).unwrap();
        assert_eq!(repaint, Repaint::Skip);
        assert_eq!(tracker.state(), WallpaperState::Stale);
        assert_eq!(desktop.current_queries.get(), 0);

        let repaint = tracker.background_changed(DesktopId(1), &desktop).unwrap();
        assert_eq!(repaint, Repaint::Now);
        let repaint = tracker.background_changed(DesktopId(2), &desktop).unwrap();
        assert_eq!(repaint, Repaint::Skip);
        assert_eq!(tracker.state(), WallpaperState::Fresh(DesktopId(1)));
    }

    #[test]
    fn visible_background_change_repaints_now() {
        let desktop = FakeDesktop::new(on(2), 2);
        let mut tracker = DesktopVisibilityTracker::new();

        let repaint = tracker.background_changed(DesktopId(2), &desktop).unwrap();
        assert_eq!(repaint, Repaint::Now);
        assert_eq!(tracker.state(), WallpaperState::Fresh(DesktopId(2)));
    }

    #[test]
    fn hidden_change_is_deferred_until_activation() {
        let mut desktop = FakeDesktop::new(on(1), 0);
        let mut tracker = DesktopVisibilityTracker::new();

        let repaint = tracker.background_changed(DesktopId(1), &desktop).unwrap();
        assert_eq!(repaint, Repaint::Skip);
        assert_eq!(tracker.state(), WallpaperState::Stale);

        desktop.current = DesktopId(1);
        let repaints = [
            tracker.desktop_activated(DesktopId(1), &desktop).unwrap(),
            tracker.desktop_activated(DesktopId(1), &desktop).unwrap(),
        ];
        assert_eq!(repaints, [Repaint::Now, Repaint::Skip]);
        assert_eq!(tracker.state(), WallpaperState::Fresh(DesktopId(1)));
    }

    #[test]
    fn fresh_picture_becomes_stale_after_hidden_change() {
        let mut desktop = FakeDesktop::new(on(1), 1);
        let mut tracker = DesktopVisibilityTracker::new();
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Now);

        desktop.current = DesktopId(0);
        assert_eq!(tracker.desktop_activated(DesktopId(0), &desktop).unwrap(), Repaint::Skip);
        assert_eq!(tracker.background_changed(DesktopId(1), &desktop).unwrap(), Repaint::Skip);
        assert_eq!(tracker.state(), WallpaperState::Stale);

        desktop.current = DesktopId(1);
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Now);
    }

    #[test]
    fn resync_marks_fresh_only_on_own_visible_desktop() {
        let mut desktop = FakeDesktop::new(on(1), 0);
        let mut tracker = DesktopVisibilityTracker::new();
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Now);

        // Picture taken while desktop 0 is showing
        tracker.resync(&desktop).unwrap();
        assert_eq!(tracker.state(), WallpaperState::Stale);

        desktop.current = DesktopId(1);
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Now);

        tracker.resync(&desktop).unwrap();
        assert_eq!(tracker.state(), WallpaperState::Fresh(DesktopId(1)));
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Skip);

        tracker.reset();
        assert_eq!(tracker.state(), WallpaperState::Stale);
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Now);
    }

    #[test]
    fn resync_leaves_sticky_window_stale() {
        let desktop = FakeDesktop::new(DesktopPlacement::from_raw(ALL_DESKTOPS), 3);
        let mut tracker = DesktopVisibilityTracker::new();

        tracker.resync(&desktop).unwrap();
        assert_eq!(tracker.state(), WallpaperState::Stale);
        assert!(tracker.resync(&BrokenDesktop).is_err());
    }

    #[test]
    fn sticky_window_repaints_on_every_activation() {
        let desktop = FakeDesktop::new(DesktopPlacement::from_raw(ALL_DESKTOPS), 0);
        let mut tracker = DesktopVisibilityTracker::new();

        for desk in [0, 1, 1, 4] {
            let repaint = tracker.desktop_activated(DesktopId(desk), &desktop).unwrap();
            assert_eq!(repaint, Repaint::Now);
        }
        assert_eq!(tracker.state(), WallpaperState::Stale);
    }

    #[test]
    fn failed_query_leaves_state_alone() {
        let mut tracker = DesktopVisibilityTracker::new();
        let desktop = FakeDesktop::new(on(1), 1);
        assert_eq!(tracker.desktop_activated(DesktopId(1), &desktop).unwrap(), Repaint::Now);

        assert!(tracker.background_changed(DesktopId(1), &BrokenDesktop).is_err());
        assert!(tracker.desktop_activated(DesktopId(2), &BrokenDesktop).is_err());
        assert_eq!(tracker.state(), WallpaperState::Fresh(DesktopId(1)));
    }
}
