//! One interactive session: the frame sequence, the live view over it, and its exporters.

use crate::config::TimelineConfig;
use crate::export::animated::export_animated;
use crate::export::archive::export_archive;
use crate::export::artifact::{ExportArtifact, export_basename};
use crate::export::job::{ExportContext, ExportSlots, ProgressSink};
use crate::export::snapshot::export_snapshot;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::playback::controller::PlaybackState;
use crate::playback::viewer::Viewer;
use crate::render::raster::Rasterizer;
use crate::render::surface::Surface;
use crate::sequence::engine::OptimizationEngine;
use crate::sequence::source::SourceImage;
use crate::sequence::store::SceneStore;

/// Host-facing entry point tying a [`SceneStore`] to playback and export.
///
/// Exports borrow the session immutably, so the session itself cannot re-run while one is in
/// flight. Other holders of a [`SceneStore`] clone can still `run`/`reset` it, and running exports
/// then fail with [`TimelineError::StaleSequence`].
#[derive(Debug)]
pub struct Session {
    config: TimelineConfig,
    store: SceneStore,
    rasterizer: Rasterizer,
    viewer: Viewer,
    slots: ExportSlots,
    basename: String,
}

impl Session {
    /// Session with a fresh, empty sequence.
    pub fn new(config: TimelineConfig) -> TimelineResult<Self> {
        Self::with_store(config, SceneStore::new())
    }

    /// Session over an existing store handle.
    pub fn with_store(config: TimelineConfig, store: SceneStore) -> TimelineResult<Self> {
        config.validate()?;
        let rasterizer = Rasterizer::new(config.default_size);
        let mut viewer = Viewer::new(store.clone(), config.playback.default_speed)?;
        viewer.set_background(Some(config.background));
        let basename = config.file_basename.clone();
        Ok(Self {
            config,
            store,
            rasterizer,
            viewer,
            slots: ExportSlots::new(),
            basename,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Shared handle to the frame sequence.
    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    /// Export busy flags.
    pub fn slots(&self) -> &ExportSlots {
        &self.slots
    }

    /// Base used for generated export file names.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Derive the export base name from the source file's name (extension stripped).
    pub fn set_source_name(&mut self, name: Option<&str>) {
        self.basename = export_basename(name, &self.config.file_basename);
    }

    /// Run the engine over `source` and show the resulting sequence's final step.
    ///
    /// Playback is unbound before the engine starts. An engine failure resets the whole session.
    #[tracing::instrument(skip(self, engine, source), fields(w = source.size.width, h = source.size.height))]
    pub fn run(
        &mut self,
        engine: &mut dyn OptimizationEngine,
        algorithm_id: u32,
        target_count: u32,
        source: &SourceImage,
    ) -> TimelineResult<u32> {
        let max = self.config.limits.max_target_count;
        if target_count == 0 || target_count > max {
            return Err(TimelineError::validation(format!(
                "target count must be in 1..={max}, got {target_count}"
            )));
        }

        // Reject a bad source before touching the current sequence or playback.
        source.size.validate()?;

        self.viewer.unbind();
        if let Err(e) = self
            .store
            .initialize(source.size.width, source.size.height)
        {
            self.reset();
            return Err(e);
        }
        self.rasterizer.set_source_size(Some(source.size));

        match self
            .store
            .run(engine, algorithm_id, target_count, &source.rgba)
        {
            Ok(frames) => {
                self.viewer.bind(&self.rasterizer)?;
                tracing::info!(frames, "sequence ready");
                Ok(frames)
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine run failed; session reset");
                self.reset();
                Err(e)
            }
        }
    }

    /// Drop the sequence and every piece of state derived from it.
    pub fn reset(&mut self) {
        self.store.reset();
        self.rasterizer.set_source_size(None);
        self.viewer.unbind();
    }

    /// Playback state snapshot.
    pub fn playback(&self) -> PlaybackState {
        self.viewer.state()
    }

    /// Surface showing the current step, once one has rendered.
    pub fn surface(&self) -> Option<&Surface> {
        self.viewer.surface()
    }

    /// Change playback speed (steps per second); also the animated export's speed hint.
    pub fn set_speed(&mut self, speed: f64) -> TimelineResult<()> {
        self.viewer.controller_mut().set_speed(speed)
    }

    /// See [`Viewer::seek`].
    pub fn seek(&mut self, step: i64) -> Option<u32> {
        self.viewer.seek(step, &self.rasterizer)
    }

    /// See [`Viewer::toggle_play`].
    pub fn toggle_play(&mut self, now_ms: f64) {
        self.viewer.toggle_play(now_ms, &self.rasterizer);
    }

    /// See [`Viewer::tick`].
    pub fn tick(&mut self, now_ms: f64) -> Option<u32> {
        self.viewer.tick(now_ms, &self.rasterizer)
    }

    fn export_context(&self) -> ExportContext<'_> {
        ExportContext {
            store: &self.store,
            rasterizer: &self.rasterizer,
            slots: &self.slots,
            config: &self.config,
            basename: &self.basename,
            stamp: None,
        }
    }

    /// PNG of the step currently shown by playback.
    pub async fn export_snapshot(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> TimelineResult<ExportArtifact> {
        let step = self.viewer.state().current_step;
        export_snapshot(&self.export_context(), step, progress).await
    }

    /// PNG of an explicit step.
    pub async fn export_snapshot_at(
        &self,
        step: u32,
        progress: &mut dyn ProgressSink,
    ) -> TimelineResult<ExportArtifact> {
        export_snapshot(&self.export_context(), step, progress).await
    }

    /// GIF sampled for the current playback speed.
    pub async fn export_animated(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> TimelineResult<ExportArtifact> {
        let hint = self.viewer.state().speed;
        export_animated(&self.export_context(), hint, progress).await
    }

    /// ZIP of every step as PNG.
    pub async fn export_archive(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> TimelineResult<ExportArtifact> {
        export_archive(&self.export_context(), progress).await
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
