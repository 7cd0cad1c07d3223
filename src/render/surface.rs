use resvg::tiny_skia;

use crate::foundation::core::{PixelSize, Rgba8};
use crate::foundation::error::{TimelineError, TimelineResult};

/// A reusable premultiplied RGBA8 drawing surface.
///
/// One export job owns one surface for its whole lifetime; the pixel buffer is only
/// reallocated when the requested size changes.
pub struct Surface {
    pixmap: tiny_skia::Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish()
    }
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(size: PixelSize) -> TimelineResult<Self> {
        Ok(Self {
            pixmap: alloc_pixmap(size)?,
        })
    }

    /// Current dimensions.
    pub fn size(&self) -> PixelSize {
        PixelSize {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
        }
    }

    /// Resize to `size`, reallocating only when it differs. Returns whether it reallocated.
    pub fn ensure_size(&mut self, size: PixelSize) -> TimelineResult<bool> {
        if self.size() == size {
            return Ok(false);
        }
        self.pixmap = alloc_pixmap(size)?;
        Ok(true)
    }

    /// Fill with `background`, or clear to transparent when `None`.
    pub fn clear(&mut self, background: Option<Rgba8>) {
        let color = background.map_or(tiny_skia::Color::TRANSPARENT, Rgba8::to_skia);
        self.pixmap.fill(color);
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn premul_data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Copy the pixels out as straight-alpha RGBA8.
    ///
    /// The returned image owns its data, so the surface may be redrawn immediately.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let PixelSize { width, height } = self.size();
        let mut out = Vec::with_capacity(self.size().rgba_len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        image::RgbaImage::from_raw(width, height, out)
            .unwrap_or_else(|| image::RgbaImage::new(width, height))
    }

    pub(crate) fn pixmap_mut(&mut self) -> tiny_skia::PixmapMut<'_> {
        self.pixmap.as_mut()
    }
}

fn alloc_pixmap(size: PixelSize) -> TimelineResult<tiny_skia::Pixmap> {
    size.validate()
        .map_err(|e| TimelineError::rasterization(format!("invalid surface size: {e}")))?;
    tiny_skia::Pixmap::new(size.width, size.height).ok_or_else(|| {
        TimelineError::rasterization(format!(
            "failed to allocate {}x{} surface",
            size.width, size.height
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
