//! Background compositing
//!
//! Turns a schema's background image into something the view can paint:
//! the raw image for tiling, a centered canvas, or a stretched copy. Loaded
//! sources and the last composite are cached so repeated requests for the
//! same geometry do no work.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, trace, warn};

use crate::geometry::PixelSize;
use crate::schema::{Alignment, Rgb};

/// Result of composing a background
#[derive(Debug, Clone, PartialEq)]
pub enum CompositedImage {
    /// No usable image; the view paints its default background color
    Flat,
    /// Unscaled source image; the view repeats it across its area
    Tiled(Arc<RgbaImage>),
    /// Canvas of exactly the requested size
    Fitted(Arc<RgbaImage>),
}

impl CompositedImage {
    pub fn is_flat(&self) -> bool {
        matches!(self, CompositedImage::Flat)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    path: PathBuf,
    mode: Alignment,
    target: PixelSize,
    fallback: Rgb,
    generation: u64,
}

#[derive(Debug)]
struct LoadedImage {
    path: PathBuf,
    image: Arc<RgbaImage>,
}

/// Background compositor for one view
#[derive(Debug, Default)]
pub struct BackgroundCompositor {
    loaded: Option<LoadedImage>,
    cached: Option<(CacheKey, CompositedImage)>,
    /// Path whose last load failed; its mode stays `None` until the path changes
    demoted: Option<PathBuf>,
    /// Bumped whenever the desktop background changes anywhere
    generation: u64,
}

impl BackgroundCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode that will actually be used for `path`
    pub fn effective_mode(&self, path: &Path, requested: Alignment) -> Alignment {
        if path.as_os_str().is_empty() || self.demoted.as_deref() == Some(path) {
            Alignment::None
        } else {
            requested
        }
    }

    /// Compose the background for `path` placed with `mode` in a view of `target`.
    ///
    /// Load failures are not errors: the result is `Flat` and the path is
    /// demoted to `Alignment::None` until a different path is supplied.
    pub fn compose(
        &mut self,
        path: &Path,
        mode: Alignment,
        target: PixelSize,
        fallback: Rgb,
    ) -> CompositedImage {
        if self.demoted.as_deref().is_some_and(|demoted| demoted != path) {
            self.demoted = None;
        }

        let mode = self.effective_mode(path, mode);
        if mode == Alignment::None {
            return CompositedImage::Flat;
        }

        let key = CacheKey {
            path: path.to_path_buf(),
            mode,
            target,
            fallback,
            generation: self.generation,
        };
        if let Some((cached_key, image)) = &self.cached {
            if *cached_key == key {
                trace!("Background cache hit for {:?}", path);
                return image.clone();
            }
        }

        let Some(source) = self.load(path) else {
            self.cached = None;
            return CompositedImage::Flat;
        };

        let image = match mode {
            Alignment::None => CompositedImage::Flat,
            Alignment::Tile => CompositedImage::Tiled(source),
            Alignment::Center if !target.is_empty() => {
                CompositedImage::Fitted(Arc::new(center(&source, target, fallback)))
            }
            Alignment::Scale if !target.is_empty() => {
                CompositedImage::Fitted(Arc::new(scale(&source, target)))
            }
            Alignment::Center | Alignment::Scale => {
                debug!("View has no area yet, using flat background");
                CompositedImage::Flat
            }
        };

        self.cached = Some((key, image.clone()));
        image
    }

    /// Forget the cached composite and the loaded source; the next
    /// `compose` reloads from disk.
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.loaded = None;
    }

    /// Record a desktop background change; cached composites are stale
    pub fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.cached = None;
    }

    fn load(&mut self, path: &Path) -> Option<Arc<RgbaImage>> {
        if let Some(loaded) = &self.loaded {
            if loaded.path == path {
                return Some(Arc::clone(&loaded.image));
            }
        }

        match image::open(path) {
            Ok(image) => {
                let image = Arc::new(image.into_rgba8());
                debug!(
                    "Loaded background {:?} ({}x{})",
                    path,
                    image.width(),
                    image.height()
                );
                self.loaded = Some(LoadedImage {
                    path: path.to_path_buf(),
                    image: Arc::clone(&image),
                });
                Some(image)
            }
            Err(e) => {
                warn!("Failed to load background image {:?}: {}", path, e);
                self.loaded = None;
                self.demoted = Some(path.to_path_buf());
                None
            }
        }
    }
}

/// Canvas of `target` filled with `fill`, `source` copied to the middle.
/// Offsets truncate toward zero and may be negative; overhanging pixels are clipped.
fn center(source: &RgbaImage, target: PixelSize, fill: Rgb) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(target.width, target.height, fill.opaque());
    let x = (i64::from(target.width) - i64::from(source.width())) / 2;
    let y = (i64::from(target.height) - i64::from(source.height())) / 2;
    imageops::replace(&mut canvas, source, x, y);
    canvas
}

/// Non-uniform stretch of `source` to exactly `target`
fn scale(source: &RgbaImage, target: PixelSize) -> RgbaImage {
    let sx = target.width as f32 / source.width() as f32;
    let sy = target.height as f32 / source.height() as f32;
    trace!("Scaling background by {:.3}x{:.3}", sx, sy);
    imageops::resize(source, target.width, target.height, FilterType::Triangle)
}

/// Blend every pixel toward `tint` by `strength` (0.0..=1.0); alpha becomes opaque.
pub fn fade(image: &mut RgbaImage, strength: f32, tint: Rgb) {
    let strength = strength.clamp(0.0, 1.0);
    let tint = [tint.0, tint.1, tint.2];
    for pixel in image.pixels_mut() {
        for (channel, t) in pixel.0.iter_mut().zip(tint) {
            let blended = f32::from(*channel) * (1.0 - strength) + f32::from(t) * strength;
            *channel = blended.round() as u8;
        }
        pixel.0[3] = 0xff;
    }
}
