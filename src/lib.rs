//! rectfit plays back and exports the frame sequence of a rectangle-fitting optimizer.
//!
//! An external engine turns a source photograph into an ordered list of SVG scenes, one per
//! optimization step. This crate owns everything after that:
//!
//! - Freeze the engine output in a [`SceneStore`]
//! - Rasterize scenes onto a [`Surface`] with the [`Rasterizer`]
//! - Play the sequence back at a fixed step rate with a [`PlaybackController`] / [`Viewer`]
//! - Export a PNG snapshot, a sampled GIF, or a ZIP of every frame
//!
//! [`Session`] bundles these for a host UI or the `rectfit` CLI.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Runtime configuration loaded from JSON.
pub mod config;
pub(crate) mod export;
pub(crate) mod playback;
pub(crate) mod render;
pub(crate) mod sequence;
/// Host-facing session API.
pub mod session;

pub use crate::foundation::core::{PixelSize, Rgba8};
pub use crate::foundation::error::{TimelineError, TimelineResult};

pub use crate::config::{
    AnimatedConfig, ArchiveConfig, PlaybackConfig, SourceLimits, TimelineConfig,
};
pub use crate::export::animated::{AnimatedTiming, export_animated, sample_steps};
pub use crate::export::archive::{archive_entry_name, export_archive, yield_interval};
pub use crate::export::artifact::{
    ExportArtifact, export_basename, export_file_name, local_now,
};
pub use crate::export::job::{
    ExportContext, ExportJob, ExportKind, ExportSlots, JobGuard, NoProgress, ProgressSink,
};
pub use crate::export::sched::{YieldNow, yield_now};
pub use crate::export::snapshot::export_snapshot;
pub use crate::playback::controller::{PlaybackController, PlaybackState};
pub use crate::playback::viewer::Viewer;
pub use crate::render::decode::{
    DecodePath, DecodedScene, FastSvgPath, GenericImagePath, system_fonts,
};
pub use crate::render::raster::{RasterOptions, Rasterizer};
pub use crate::render::surface::Surface;
pub use crate::sequence::engine::{OptimizationEngine, PrecomputedEngine, RunRequest};
pub use crate::sequence::scene::SceneDescription;
pub use crate::sequence::source::SourceImage;
pub use crate::sequence::store::SceneStore;
pub use crate::session::Session;
