use std::io::{Cursor, Write as _};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::export::artifact::ExportArtifact;
use crate::export::job::{ExportContext, ExportKind, ProgressSink};
use crate::export::sched::yield_now;
use crate::export::snapshot::encode_surface_png;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::render::raster::RasterOptions;

const FRAMES_DIR: &str = "frames/";

/// `frames/frame_<step>.png`, zero-padded to the digit count of `frame_count`.
pub fn archive_entry_name(step: u32, frame_count: u32) -> String {
    let width = frame_count.to_string().len();
    format!("{FRAMES_DIR}frame_{step:0width$}.png")
}

/// Frames between cooperative yields: `ceil(frame_count * fraction)`, at least 1.
pub fn yield_interval(frame_count: u32, fraction: f64) -> u32 {
    let every = (f64::from(frame_count) * fraction).ceil();
    if every.is_finite() && every >= 1.0 {
        every.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Pack every step as a PNG into a ZIP archive.
///
/// Bytes are returned only once the whole archive is written; a failure at any frame fails the
/// job.
#[tracing::instrument(skip(ctx, progress), fields(kind = %ExportKind::Archive))]
pub async fn export_archive(
    ctx: &ExportContext<'_>,
    progress: &mut dyn ProgressSink,
) -> TimelineResult<ExportArtifact> {
    let (_guard, mut job) = ctx.begin(ExportKind::Archive)?;
    let frame_count = job.frame_count();
    let cfg = &ctx.config.archive;
    let every = yield_interval(frame_count, cfg.yield_every_fraction);

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(i64::from(cfg.compression_level)));
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_directory(FRAMES_DIR, options)
        .map_err(|e| zip_error("frames directory", e))?;

    let first = job.frame(1)?;
    let mut surface = ctx.rasterizer.surface_for(&first)?;
    let opts = RasterOptions::with_background(ctx.config.background).keep_size();

    for step in 1..=frame_count {
        let scene = job.frame(step)?;
        ctx.rasterizer.rasterize(&scene, &mut surface, &opts)?;
        let png = encode_surface_png(&surface)?;

        let name = archive_entry_name(step, frame_count);
        zip.start_file(name.as_str(), options)
            .map_err(|e| zip_error(&name, e))?;
        zip.write_all(&png)
            .map_err(|e| TimelineError::encoding(format!("zip entry '{name}': {e}")))?;

        if step % every == 0 || step == frame_count {
            // Leave the last slice of progress for the central directory.
            job.report(0.99 * step as f32 / frame_count as f32, progress);
            tracing::debug!(step, "yield");
            yield_now().await;
        }
    }

    job.check_fresh()?;
    let bytes = zip
        .finish()
        .map_err(|e| zip_error("central directory", e))?
        .into_inner();
    job.check_fresh()?;
    job.report(1.0, progress);
    tracing::info!(frames = frame_count, bytes = bytes.len(), "export finished");

    Ok(ExportArtifact::new(
        ExportKind::Archive,
        ctx.basename,
        ctx.timestamp(),
        bytes,
    ))
}

fn zip_error(what: &str, e: zip::result::ZipError) -> TimelineError {
    TimelineError::encoding(format!("zip {what}: {e}"))
}

#[cfg(test)]
#[path = "../../tests/unit/export/archive.rs"]
mod tests;
