use std::io::Cursor;

use crate::export::artifact::ExportArtifact;
use crate::export::job::{ExportContext, ExportKind, ProgressSink};
use crate::export::sched::yield_now;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::render::raster::RasterOptions;
use crate::render::surface::Surface;

/// Render `step` onto a fresh surface over the configured background and encode it as PNG.
#[tracing::instrument(skip(ctx, progress), fields(kind = %ExportKind::Snapshot))]
pub async fn export_snapshot(
    ctx: &ExportContext<'_>,
    step: u32,
    progress: &mut dyn ProgressSink,
) -> TimelineResult<ExportArtifact> {
    let (_guard, mut job) = ctx.begin(ExportKind::Snapshot)?;
    if step == 0 || step > job.frame_count() {
        return Err(TimelineError::validation(format!(
            "snapshot step {step} is outside 1..={}",
            job.frame_count()
        )));
    }

    let scene = job.frame(step)?;
    let mut surface = ctx.rasterizer.surface_for(&scene)?;
    ctx.rasterizer.rasterize(
        &scene,
        &mut surface,
        &RasterOptions::with_background(ctx.config.background),
    )?;
    job.report(0.5, progress);
    tracing::debug!(step, "yield before png encode");
    yield_now().await;

    let bytes = encode_surface_png(&surface)?;
    job.check_fresh()?;
    job.report(1.0, progress);
    tracing::info!(step, bytes = bytes.len(), "export finished");

    Ok(ExportArtifact::new(
        ExportKind::Snapshot,
        ctx.basename,
        ctx.timestamp(),
        bytes,
    ))
}

/// PNG bytes of the surface's straight-alpha pixels.
pub(crate) fn encode_surface_png(surface: &Surface) -> TimelineResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    surface
        .to_rgba8()
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| TimelineError::encoding(format!("png encode failed: {e}")))?;
    Ok(out.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/export/snapshot.rs"]
mod tests;
