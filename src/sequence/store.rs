use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::foundation::core::PixelSize;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::sequence::engine::{OptimizationEngine, RunRequest};
use crate::sequence::scene::SceneDescription;

#[derive(Debug, Default)]
struct StoreInner {
    source_size: Option<PixelSize>,
    scenes: Arc<[SceneDescription]>,
    generation: u64,
}

/// The frame sequence produced by one engine run.
///
/// `SceneStore` is a cheap-clone handle; clones observe the same sequence. Steps are 1-indexed.
/// Every `initialize`, `run`, and `reset` bumps [`SceneStore::generation`], which export jobs
/// compare against to detect that the frames they were reading are gone.
#[derive(Clone, Debug, Default)]
pub struct SceneStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl SceneStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepare for a run over a `width` x `height` source image, dropping any previous frames.
    pub fn initialize(&self, width: u32, height: u32) -> TimelineResult<()> {
        let size = PixelSize::new(width, height)?;
        let mut inner = self.write();
        inner.source_size = Some(size);
        inner.scenes = Arc::from(Vec::new());
        inner.generation += 1;
        Ok(())
    }

    /// Run `engine` over `rgba` and freeze its output as the new sequence.
    ///
    /// Returns the frame count. On failure the store is left empty.
    #[tracing::instrument(skip(self, engine, rgba), fields(bytes = rgba.len()))]
    pub fn run(
        &self,
        engine: &mut dyn OptimizationEngine,
        algorithm_id: u32,
        target_count: u32,
        rgba: &[u8],
    ) -> TimelineResult<u32> {
        let size = self.source_size().ok_or_else(|| {
            TimelineError::validation("scene store must be initialized before run")
        })?;
        if rgba.len() != size.rgba_len() {
            return Err(TimelineError::validation(format!(
                "pixel buffer length {} does not match {}x{} rgba",
                rgba.len(),
                size.width,
                size.height
            )));
        }

        // Frames from a previous run are stale as soon as a new run starts.
        self.clear_scenes();

        let req = RunRequest {
            algorithm_id,
            target_count,
            size,
            rgba,
        };
        let scenes = match engine.run(&req) {
            Ok(scenes) if scenes.is_empty() => {
                return Err(TimelineError::algorithm("engine produced no frames"));
            }
            Ok(scenes) => scenes,
            Err(e) => return Err(TimelineError::algorithm(format!("{e:#}"))),
        };

        let count = u32::try_from(scenes.len())
            .map_err(|_| TimelineError::algorithm("engine produced too many frames"))?;
        let frozen: Arc<[SceneDescription]> =
            scenes.into_iter().map(SceneDescription::from).collect();

        let mut inner = self.write();
        inner.scenes = frozen;
        inner.generation += 1;
        tracing::debug!(frames = count, generation = inner.generation, "sequence frozen");
        Ok(count)
    }

    /// Number of frames; 0 before any successful run.
    pub fn frame_count(&self) -> u32 {
        self.read().scenes.len() as u32
    }

    /// Scene for `step` (1-indexed), or `None` when out of range.
    pub fn frame_at(&self, step: u32) -> Option<SceneDescription> {
        let idx = usize::try_from(step.checked_sub(1)?).ok()?;
        self.read().scenes.get(idx).cloned()
    }

    /// Drop all frames and the source size.
    pub fn reset(&self) {
        let mut inner = self.write();
        inner.source_size = None;
        inner.scenes = Arc::from(Vec::new());
        inner.generation += 1;
    }

    /// Invalidation counter; changes on every `initialize`, `run`, and `reset`.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Dimensions of the source image of the current run, if initialized.
    pub fn source_size(&self) -> Option<PixelSize> {
        self.read().source_size
    }

    fn clear_scenes(&self) {
        let mut inner = self.write();
        if !inner.scenes.is_empty() {
            inner.scenes = Arc::from(Vec::new());
            inner.generation += 1;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/store.rs"]
mod tests;
