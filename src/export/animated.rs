//! Animated export: sampled steps encoded as a GIF.
//!
//! Steps are rasterized in chunks on the calling task (yielding after each frame), then each
//! chunk's palettes are quantized in parallel on a rayon pool and written in step order.

use rayon::prelude::*;

use crate::config::AnimatedConfig;
use crate::export::artifact::ExportArtifact;
use crate::export::job::{ExportContext, ExportKind, ProgressSink};
use crate::export::sched::yield_now;
use crate::foundation::core::PixelSize;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::render::raster::RasterOptions;

/// Sampling stride and per-frame delay derived from the playback speed hint.
///
/// The hint maps onto an exponential speed curve, `speed_value = 1.2^(hint / 10)` steps per 2 s
/// (about 3 steps/s at a hint of 100). Every `stride`-th step is kept and shown for `delay_ms`,
/// so a coarser stride is paid back with a longer delay. This curve is independent of the live
/// view's steps-per-second rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimatedTiming {
    /// Distance between sampled steps, `>= 1`.
    pub stride: u32,
    /// Delay of every frame but the last, in milliseconds.
    pub delay_ms: u32,
    /// Delay of the last frame, in milliseconds.
    pub final_hold_ms: u32,
}

impl AnimatedTiming {
    /// Timing for a UI speed hint.
    ///
    /// The final hold is raised to at least twice the interior delay so the last frame always
    /// stays up distinctly longer than the others.
    pub fn from_speed_hint(hint: f64, final_hold_ms: u32) -> TimelineResult<Self> {
        if !hint.is_finite() {
            return Err(TimelineError::validation(format!(
                "animated speed hint must be finite, got {hint}"
            )));
        }
        let speed_value = 1.2f64.powf(hint / 10.0);
        let stride = (100.0 * speed_value / 2000.0).round().clamp(1.0, f64::from(u32::MAX));
        let delay_ms = (stride * 2000.0 / speed_value)
            .round()
            .clamp(0.0, f64::from(u32::MAX));
        let delay_ms = delay_ms as u32;
        Ok(Self {
            stride: stride as u32,
            delay_ms,
            final_hold_ms: final_hold_ms.max(delay_ms.saturating_mul(2)),
        })
    }

    /// Delay for the `index`-th of `len` sampled frames.
    pub fn delay_for(&self, index: usize, len: usize) -> u32 {
        if index + 1 == len {
            self.final_hold_ms
        } else {
            self.delay_ms
        }
    }
}

/// Steps `1, 1+stride, 1+2*stride, ...` below `frame_count`, then `frame_count` itself.
///
/// The final step is always present exactly once.
pub fn sample_steps(frame_count: u32, stride: u32) -> Vec<u32> {
    if frame_count == 0 {
        return Vec::new();
    }
    let stride = stride.max(1) as usize;
    let mut steps: Vec<u32> = (1..frame_count).step_by(stride).collect();
    steps.push(frame_count);
    steps
}

/// Encode a GIF of the steps sampled for `speed_hint`.
#[tracing::instrument(skip(ctx, progress), fields(kind = %ExportKind::Animated))]
pub async fn export_animated(
    ctx: &ExportContext<'_>,
    speed_hint: f64,
    progress: &mut dyn ProgressSink,
) -> TimelineResult<ExportArtifact> {
    let (_guard, mut job) = ctx.begin(ExportKind::Animated)?;
    let cfg = &ctx.config.animated;
    let timing = AnimatedTiming::from_speed_hint(speed_hint, cfg.final_hold_ms)?;
    let steps = sample_steps(job.frame_count(), timing.stride);
    tracing::debug!(
        stride = timing.stride,
        delay_ms = timing.delay_ms,
        frames = steps.len(),
        "animated export sampling"
    );

    // One surface for every frame: sized by the first scene, later scenes are scaled into it.
    let first = job.frame(1)?;
    let mut surface = ctx.rasterizer.surface_for(&first)?;
    let size = surface.size();
    let opts = RasterOptions::with_background(ctx.config.background).keep_size();

    let pool = build_quantize_pool(cfg.workers)?;
    let mut gif = GifAssembler::new(size, cfg)?;
    let total = steps.len();
    // Rasterizing and encoding each count for half of a frame's progress.
    let progress_units = (total * 2) as f32;
    let mut units = 0usize;

    for (chunk_idx, chunk) in steps.chunks(cfg.chunk_frames.max(1)).enumerate() {
        let base = chunk_idx * cfg.chunk_frames.max(1);
        let mut pending = Vec::with_capacity(chunk.len());
        for (offset, &step) in chunk.iter().enumerate() {
            let scene = job.frame(step)?;
            ctx.rasterizer.rasterize(&scene, &mut surface, &opts)?;
            pending.push(PendingFrame {
                rgba: surface.to_rgba8().into_raw(),
                delay_ms: timing.delay_for(base + offset, total),
            });
            units += 1;
            job.report(units as f32 / progress_units, progress);
            tracing::debug!(step, "yield after frame");
            yield_now().await;
        }

        job.check_fresh()?;
        let written = gif.write_chunk(&pool, pending)?;
        units += written;
        job.report(units as f32 / progress_units, progress);
        tracing::debug!(chunk = chunk_idx, written, "yield after chunk");
        yield_now().await;
    }

    let bytes = gif.finish()?;
    job.check_fresh()?;
    job.report(1.0, progress);
    tracing::info!(frames = total, bytes = bytes.len(), "export finished");

    Ok(ExportArtifact::new(
        ExportKind::Animated,
        ctx.basename,
        ctx.timestamp(),
        bytes,
    ))
}

fn build_quantize_pool(workers: usize) -> TimelineResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| TimelineError::encoding(format!("failed to build rayon thread pool: {e}")))
}

struct PendingFrame {
    rgba: Vec<u8>,
    delay_ms: u32,
}

/// Streaming GIF writer over an in-memory buffer.
struct GifAssembler {
    encoder: gif::Encoder<Vec<u8>>,
    width: u16,
    height: u16,
    speed: i32,
}

impl GifAssembler {
    fn new(size: PixelSize, cfg: &AnimatedConfig) -> TimelineResult<Self> {
        let (width, height) = match (u16::try_from(size.width), u16::try_from(size.height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(TimelineError::encoding(format!(
                    "{}x{} exceeds the gif size limit of 65535x65535",
                    size.width, size.height
                )));
            }
        };
        let mut encoder = gif::Encoder::new(Vec::new(), width, height, &[])
            .map_err(|e| TimelineError::encoding(format!("gif header: {e}")))?;
        if cfg.repeat {
            encoder
                .set_repeat(gif::Repeat::Infinite)
                .map_err(|e| TimelineError::encoding(format!("gif repeat extension: {e}")))?;
        }
        Ok(Self {
            encoder,
            width,
            height,
            speed: i32::from(cfg.quality.clamp(1, 30)),
        })
    }

    /// Quantize `frames` in parallel, then append them in order. Returns the number written.
    fn write_chunk(
        &mut self,
        pool: &rayon::ThreadPool,
        frames: Vec<PendingFrame>,
    ) -> TimelineResult<usize> {
        let (width, height, speed) = (self.width, self.height, self.speed);
        let expected = usize::from(width) * usize::from(height) * 4;
        if let Some(bad) = frames.iter().find(|f| f.rgba.len() != expected) {
            return Err(TimelineError::encoding(format!(
                "frame buffer is {} bytes, expected {expected}",
                bad.rgba.len()
            )));
        }

        let quantized: Vec<gif::Frame<'static>> = pool.install(|| {
            frames
                .into_par_iter()
                .map(|mut f| {
                    let mut frame = gif::Frame::from_rgba_speed(width, height, &mut f.rgba, speed);
                    frame.delay = delay_centis(f.delay_ms);
                    frame
                })
                .collect()
        });

        for frame in &quantized {
            self.encoder
                .write_frame(frame)
                .map_err(|e| TimelineError::encoding(format!("gif frame: {e}")))?;
        }
        Ok(quantized.len())
    }

    fn finish(self) -> TimelineResult<Vec<u8>> {
        self.encoder
            .into_inner()
            .map_err(|e| TimelineError::encoding(format!("gif trailer: {e}")))
    }
}

/// GIF delays are in hundredths of a second; never emit 0, which viewers treat as "as fast as
/// possible".
fn delay_centis(ms: u32) -> u16 {
    let centis = (ms.saturating_add(5) / 10).max(1);
    u16::try_from(centis).unwrap_or(u16::MAX)
}

#[cfg(test)]
#[path = "../../tests/unit/export/animated.rs"]
mod tests;
