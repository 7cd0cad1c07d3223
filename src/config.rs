use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{PixelSize, Rgba8};
use crate::foundation::error::{TimelineError, TimelineResult};

/// Top-level configuration for playback and the three exporters.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    /// Last-resort scene size when neither the scene nor the source image provides one.
    pub default_size: PixelSize,
    /// Backdrop every export is flattened onto.
    pub background: Rgba8,
    /// Base name used for exported files when no source file name is known.
    pub file_basename: String,
    /// Live playback settings.
    pub playback: PlaybackConfig,
    /// Animated (GIF) export settings.
    pub animated: AnimatedConfig,
    /// Frame archive (ZIP) export settings.
    pub archive: ArchiveConfig,
    /// Limits applied to the source image handed to the engine.
    pub limits: SourceLimits,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_size: PixelSize {
                width: 800,
                height: 600,
            },
            background: Rgba8::WHITE,
            file_basename: "rectangle-fitting".to_string(),
            playback: PlaybackConfig::default(),
            animated: AnimatedConfig::default(),
            archive: ArchiveConfig::default(),
            limits: SourceLimits::default(),
        }
    }
}

/// Live playback settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Steps advanced per second of wall-clock time.
    pub default_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: 100.0,
        }
    }
}

/// Animated export settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimatedConfig {
    /// Palette quantizer sampling factor, 1 (best) ..= 30 (fastest).
    pub quality: u8,
    /// Worker threads used for palette quantization.
    pub workers: usize,
    /// Frames quantized per parallel chunk.
    pub chunk_frames: usize,
    /// Hold time of the final frame, in milliseconds. Raised at export time to at least twice
    /// the interior frame delay, so smaller values (including 0) are accepted.
    pub final_hold_ms: u32,
    /// Loop the animation forever instead of playing once.
    pub repeat: bool,
}

impl Default for AnimatedConfig {
    fn default() -> Self {
        Self {
            quality: 10,
            workers: 2,
            chunk_frames: 16,
            final_hold_ms: 3000,
            repeat: true,
        }
    }
}

/// Frame archive settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Fraction of the frame count between cooperative yields.
    pub yield_every_fraction: f64,
    /// Deflate compression level, 0 ..= 9.
    pub compression_level: u8,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            yield_every_fraction: 0.05,
            compression_level: 6,
        }
    }
}

/// Size limits for the source photograph and the engine's target count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceLimits {
    /// Maximum encoded file size in bytes.
    pub max_source_bytes: u64,
    /// Maximum decoded pixel count.
    pub max_source_pixels: u64,
    /// Maximum length of either edge.
    pub max_source_side: u32,
    /// Maximum number of rectangles the engine may be asked for.
    pub max_target_count: u32,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            max_source_bytes: 15 * 1024 * 1024,
            max_source_pixels: 20_000_000,
            max_source_side: 8192,
            max_target_count: 5000,
        }
    }
}

impl TimelineConfig {
    /// Load and validate a config from a JSON file.
    pub fn from_json_path(path: &Path) -> TimelineResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a config from JSON text.
    pub fn from_json_str(text: &str) -> TimelineResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| TimelineError::validation(format!("config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> TimelineResult<()> {
        self.default_size.validate()?;
        if self.file_basename.trim().is_empty() {
            return Err(TimelineError::validation("file_basename must be non-empty"));
        }
        if !(self.playback.default_speed.is_finite() && self.playback.default_speed > 0.0) {
            return Err(TimelineError::validation(
                "playback.default_speed must be a positive number",
            ));
        }
        if !(1..=30).contains(&self.animated.quality) {
            return Err(TimelineError::validation(
                "animated.quality must be in 1..=30",
            ));
        }
        if self.animated.workers == 0 {
            return Err(TimelineError::validation("animated.workers must be >= 1"));
        }
        if self.animated.chunk_frames == 0 {
            return Err(TimelineError::validation(
                "animated.chunk_frames must be >= 1",
            ));
        }
        let f = self.archive.yield_every_fraction;
        if !(f.is_finite() && f > 0.0 && f <= 1.0) {
            return Err(TimelineError::validation(
                "archive.yield_every_fraction must be in (0, 1]",
            ));
        }
        if self.archive.compression_level > 9 {
            return Err(TimelineError::validation(
                "archive.compression_level must be in 0..=9",
            ));
        }
        if self.limits.max_source_side == 0 || self.limits.max_target_count == 0 {
            return Err(TimelineError::validation(
                "limits.max_source_side and limits.max_target_count must be >= 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
