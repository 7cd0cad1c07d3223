use anyhow::Context as _;

use crate::config::SourceLimits;
use crate::foundation::core::PixelSize;
use crate::foundation::error::{TimelineError, TimelineResult};

/// The source photograph, decoded to straight RGBA8 for the engine.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Decoded dimensions.
    pub size: PixelSize,
    /// RGBA8 bytes, tightly packed, row-major.
    pub rgba: Vec<u8>,
}

impl SourceImage {
    /// Decode encoded image bytes (PNG, JPEG, ...) and enforce `limits`.
    pub fn decode(bytes: &[u8], limits: &SourceLimits) -> TimelineResult<Self> {
        if bytes.len() as u64 > limits.max_source_bytes {
            return Err(TimelineError::validation(format!(
                "source image too large: {:.1} MiB (max {:.1} MiB)",
                bytes.len() as f64 / (1024.0 * 1024.0),
                limits.max_source_bytes as f64 / (1024.0 * 1024.0)
            )));
        }

        let dyn_img = image::load_from_memory(bytes).context("decode source image from memory")?;
        let (width, height) = (dyn_img.width(), dyn_img.height());
        check_dimensions(width, height, limits)?;

        Ok(Self {
            size: PixelSize::new(width, height)?,
            rgba: dyn_img.to_rgba8().into_raw(),
        })
    }

    /// Wrap an already-decoded RGBA8 buffer.
    pub fn from_rgba(size: PixelSize, rgba: Vec<u8>) -> TimelineResult<Self> {
        size.validate()?;
        if rgba.len() != size.rgba_len() {
            return Err(TimelineError::validation(format!(
                "rgba buffer length {} does not match {}x{}",
                rgba.len(),
                size.width,
                size.height
            )));
        }
        Ok(Self { size, rgba })
    }
}

fn check_dimensions(width: u32, height: u32, limits: &SourceLimits) -> TimelineResult<()> {
    if width.max(height) > limits.max_source_side {
        return Err(TimelineError::validation(format!(
            "source image edge too long: {width}x{height} (max {}px)",
            limits.max_source_side
        )));
    }
    let px = u64::from(width) * u64::from(height);
    if px > limits.max_source_pixels {
        return Err(TimelineError::validation(format!(
            "source image resolution too large: {width}x{height} ~ {:.1}MP (max {:.1}MP)",
            px as f64 / 1e6,
            limits.max_source_pixels as f64 / 1e6
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/source.rs"]
mod tests;
