use std::sync::Arc;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, ImageFormat, ImageOrder, Pixmap, Window};
use x11rb::rust_connection::RustConnection;

use crate::desktop::{copy_wrapped, Desktop, DesktopId, DesktopPlacement};
use crate::geometry::Rect;

use super::Atoms;

/// Desktop state read from a running X server
pub struct X11Desktop {
    conn: Arc<RustConnection>,
    root: Window,
    window: Window,
    atoms: Atoms,
}

impl X11Desktop {
    /// `window` is the top-level window whose desktop is tracked
    pub fn new(conn: Arc<RustConnection>, root: Window, window: Window, atoms: Atoms) -> Self {
        Self {
            conn,
            root,
            window,
            atoms,
        }
    }

    fn cardinal(&self, window: Window, property: Atom) -> Result<Option<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::CARDINAL, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut values| values.next()))
    }

    fn root_pixmap(&self) -> Result<Pixmap> {
        for property in [self.atoms.xrootpmap_id, self.atoms.esetroot_pmap_id] {
            let reply = self
                .conn
                .get_property(false, self.root, property, AtomEnum::PIXMAP, 0, 1)?
                .reply()?;
            if let Some(pixmap) = reply.value32().and_then(|mut values| values.next()) {
                if pixmap != 0 {
                    return Ok(pixmap);
                }
            }
        }
        anyhow::bail!("No root background pixmap published")
    }

    fn read_pixmap(&self, pixmap: Pixmap) -> Result<RgbaImage> {
        let geometry = self
            .conn
            .get_geometry(pixmap)?
            .reply()
            .context("Root background pixmap is gone")?;
        let reply = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                pixmap,
                0,
                0,
                geometry.width,
                geometry.height,
                !0,
            )?
            .reply()?;
        debug!(
            "Read root pixmap {:#x}: {}x{} depth {}",
            pixmap, geometry.width, geometry.height, reply.depth
        );

        let msb_first = self.conn.setup().image_byte_order == ImageOrder::MSB_FIRST;
        pixels_to_rgba(
            &reply.data,
            u32::from(geometry.width),
            u32::from(geometry.height),
            msb_first,
        )
    }
}

impl Desktop for X11Desktop {
    fn window_desktop(&self) -> Result<DesktopPlacement> {
        let raw = self
            .cardinal(self.window, self.atoms.net_wm_desktop)?
            .with_context(|| format!("Window {:#x} has no _NET_WM_DESKTOP", self.window))?;
        Ok(DesktopPlacement::from_raw(raw))
    }

    fn current_desktop(&self) -> Result<DesktopId> {
        let raw = self
            .cardinal(self.root, self.atoms.net_current_desktop)?
            .context("Root window has no _NET_CURRENT_DESKTOP")?;
        Ok(DesktopId(raw))
    }

    fn root_snapshot(&self, area: Rect) -> Result<RgbaImage> {
        let pixmap = self.root_pixmap()?;
        let root = self.read_pixmap(pixmap)?;
        copy_wrapped(&root, area)
    }
}

/// Convert 32 bits-per-pixel ZPixmap data (BGRX, or XRGB on MSB-first
/// servers) to opaque RGBA
fn pixels_to_rgba(data: &[u8], width: u32, height: u32, msb_first: bool) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 4;
    anyhow::ensure!(
        data.len() >= expected,
        "Image data too short: {} bytes for {}x{}",
        data.len(),
        width,
        height
    );

    let mut image = RgbaImage::new(width, height);
    for (pixel, chunk) in image.pixels_mut().zip(data.chunks_exact(4)) {
        *pixel = if msb_first {
            Rgba([chunk[1], chunk[2], chunk[3], 0xff])
        } else {
            Rgba([chunk[2], chunk[1], chunk[0], 0xff])
        };
    }
    Ok(image)
}
