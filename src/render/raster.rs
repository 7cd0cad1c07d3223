use resvg::tiny_skia;

use crate::foundation::core::{PixelSize, Rgba8};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::render::decode::{DecodePath, DecodedScene, default_paths};
use crate::render::surface::Surface;
use crate::sequence::scene::SceneDescription;

/// Per-call rasterization options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterOptions {
    /// Fill color drawn under the scene; `None` clears to transparent.
    pub background: Option<Rgba8>,
    /// Resize the surface to the scene's resolved size. When `false` the scene is scaled into
    /// the surface's current size, which keeps every frame of a multi-frame job the same size.
    pub resize_surface: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            background: None,
            resize_surface: true,
        }
    }
}

impl RasterOptions {
    /// Draw onto a solid backdrop, resizing the surface to fit the scene.
    pub fn with_background(background: Rgba8) -> Self {
        Self {
            background: Some(background),
            resize_surface: true,
        }
    }

    /// Same options, but keep the surface's current size.
    pub fn keep_size(self) -> Self {
        Self {
            resize_surface: false,
            ..self
        }
    }
}

/// Turns scene descriptions into pixels on a [`Surface`].
///
/// Size resolution: the scene's declared size, else the source image size, else
/// `default_size`. Decoding tries each [`DecodePath`] in order and fails only when all do.
pub struct Rasterizer {
    paths: Vec<Box<dyn DecodePath>>,
    source_size: Option<PixelSize>,
    default_size: PixelSize,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field(
                "paths",
                &self.paths.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("source_size", &self.source_size)
            .field("default_size", &self.default_size)
            .finish()
    }
}

impl Rasterizer {
    /// Rasterizer with the fast SVG path and the generic image fallback.
    pub fn new(default_size: PixelSize) -> Self {
        Self::with_paths(default_size, default_paths())
    }

    /// Rasterizer with an explicit decode chain, tried in order.
    pub fn with_paths(default_size: PixelSize, paths: Vec<Box<dyn DecodePath>>) -> Self {
        Self {
            paths,
            source_size: None,
            default_size,
        }
    }

    /// Record the size of the most recent source image (used when scenes omit their size).
    pub fn set_source_size(&mut self, size: Option<PixelSize>) {
        self.source_size = size;
    }

    /// Pixel size `scene` would be rasterized at.
    pub fn resolve_size(&self, scene: &SceneDescription) -> TimelineResult<PixelSize> {
        let size = match scene.declared_size() {
            Some((width, height)) => PixelSize { width, height },
            None => self.source_size.unwrap_or(self.default_size),
        };
        size.validate().map_err(|e| {
            TimelineError::rasterization(format!("scene dimensions do not resolve: {e}"))
        })?;
        Ok(size)
    }

    /// Allocate a surface sized for `scene`.
    pub fn surface_for(&self, scene: &SceneDescription) -> TimelineResult<Surface> {
        Surface::new(self.resolve_size(scene)?)
    }

    /// Draw `scene` onto `surface`, replacing its previous contents.
    ///
    /// Deterministic: the same scene and options always produce the same pixels. On error the
    /// surface contents are unspecified but the surface stays usable.
    pub fn rasterize(
        &self,
        scene: &SceneDescription,
        surface: &mut Surface,
        opts: &RasterOptions,
    ) -> TimelineResult<()> {
        if opts.resize_surface {
            surface.ensure_size(self.resolve_size(scene)?)?;
        }

        let decoded = self.decode(scene)?;

        surface.clear(opts.background);
        let target = surface.size();
        let mut canvas = surface.pixmap_mut();
        match decoded {
            DecodedScene::Vector(tree) => {
                let sx = target.width as f32 / tree.size().width();
                let sy = target.height as f32 / tree.size().height();
                resvg::render(
                    &tree,
                    tiny_skia::Transform::from_scale(sx, sy),
                    &mut canvas,
                );
            }
            DecodedScene::Raster(src) => {
                let sx = target.width as f32 / src.width() as f32;
                let sy = target.height as f32 / src.height() as f32;
                canvas.draw_pixmap(
                    0,
                    0,
                    src.as_ref(),
                    &tiny_skia::PixmapPaint {
                        quality: tiny_skia::FilterQuality::Nearest,
                        ..tiny_skia::PixmapPaint::default()
                    },
                    tiny_skia::Transform::from_scale(sx, sy),
                    None,
                );
            }
        }
        Ok(())
    }

    fn decode(&self, scene: &SceneDescription) -> TimelineResult<DecodedScene> {
        let mut failures = Vec::with_capacity(self.paths.len());
        for (i, path) in self.paths.iter().enumerate() {
            match path.decode(scene) {
                Ok(decoded) => {
                    if i > 0 {
                        tracing::debug!(path = path.name(), "scene decoded by fallback path");
                    }
                    return Ok(decoded);
                }
                Err(e) => {
                    if i + 1 < self.paths.len() {
                        tracing::warn!(path = path.name(), error = %e, "decode failed; falling back");
                    }
                    failures.push(format!("{}: {e:#}", path.name()));
                }
            }
        }
        if failures.is_empty() {
            return Err(TimelineError::rasterization("no decode paths configured"));
        }
        Err(TimelineError::rasterization(format!(
            "all decode paths failed ({})",
            failures.join("; ")
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
