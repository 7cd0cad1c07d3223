use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;

use crate::config::TimelineConfig;
use crate::export::artifact::local_now;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::render::raster::Rasterizer;
use crate::sequence::scene::SceneDescription;
use crate::sequence::store::SceneStore;

/// The three export flavors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportKind {
    /// One step as a PNG.
    Snapshot,
    /// Sampled steps as a looping GIF.
    Animated,
    /// Every step as a PNG inside a ZIP.
    Archive,
}

impl ExportKind {
    const ALL: [Self; 3] = [Self::Snapshot, Self::Animated, Self::Archive];

    fn slot(self) -> usize {
        match self {
            Self::Snapshot => 0,
            Self::Animated => 1,
            Self::Archive => 2,
        }
    }

    /// File extension of the produced artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Snapshot => "png",
            Self::Animated => "gif",
            Self::Archive => "zip",
        }
    }

    /// MIME type of the produced artifact.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Snapshot => "image/png",
            Self::Animated => "image/gif",
            Self::Archive => "application/zip",
        }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Snapshot => "snapshot",
            Self::Animated => "animated",
            Self::Archive => "archive",
        })
    }
}

/// Receives progress fractions in `[0, 1]` while an export runs.
pub trait ProgressSink {
    /// Called with a non-decreasing fraction; the last call of a successful job is `1.0`.
    fn progress(&mut self, kind: ExportKind, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: FnMut(ExportKind, f32),
{
    fn progress(&mut self, kind: ExportKind, fraction: f32) {
        self(kind, fraction)
    }
}

/// Progress sink that discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _kind: ExportKind, _fraction: f32) {}
}

/// Per-kind busy flags: at most one export of each kind runs at a time.
///
/// Clones share the same flags.
#[derive(Clone, Debug, Default)]
pub struct ExportSlots {
    busy: Arc<[AtomicBool; 3]>,
}

impl ExportSlots {
    /// Fresh set of idle slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `kind`, or fail with [`TimelineError::Busy`].
    pub fn try_begin(&self, kind: ExportKind) -> TimelineResult<JobGuard> {
        self.busy[kind.slot()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TimelineError::Busy(kind))?;
        Ok(JobGuard {
            busy: Arc::clone(&self.busy),
            kind,
        })
    }

    /// Whether an export of `kind` is running.
    pub fn is_busy(&self, kind: ExportKind) -> bool {
        self.busy[kind.slot()].load(Ordering::Acquire)
    }

    /// Kinds currently running.
    pub fn running(&self) -> Vec<ExportKind> {
        ExportKind::ALL
            .into_iter()
            .filter(|k| self.is_busy(*k))
            .collect()
    }
}

/// Holds an export slot; releases it on drop, whether the job finished or failed.
#[derive(Debug)]
pub struct JobGuard {
    busy: Arc<[AtomicBool; 3]>,
    kind: ExportKind,
}

impl JobGuard {
    /// Kind of the claimed slot.
    pub fn kind(&self) -> ExportKind {
        self.kind
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.busy[self.kind.slot()].store(false, Ordering::Release);
    }
}

/// Bookkeeping for one running export: what it captured and how far it got.
#[derive(Debug)]
pub struct ExportJob {
    kind: ExportKind,
    store: SceneStore,
    generation: u64,
    frame_count: u32,
    progress: f32,
}

impl ExportJob {
    /// Capture the store's current sequence for an export of `kind`.
    ///
    /// Fails with a validation error when there is no sequence to export.
    pub fn capture(kind: ExportKind, store: &SceneStore) -> TimelineResult<Self> {
        let generation = store.generation();
        let frame_count = store.frame_count();
        if frame_count == 0 {
            return Err(TimelineError::validation(format!(
                "nothing to export: no frame sequence (run the engine before a {kind} export)"
            )));
        }
        // A run or reset between the two reads would make the pair inconsistent.
        if store.generation() != generation {
            return Err(TimelineError::StaleSequence {
                captured: generation,
                live: store.generation(),
            });
        }
        Ok(Self {
            kind,
            store: store.clone(),
            generation,
            frame_count,
            progress: 0.0,
        })
    }

    /// Export kind.
    pub fn kind(&self) -> ExportKind {
        self.kind
    }

    /// Frame count captured at start.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Last reported progress fraction.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Fail with [`TimelineError::StaleSequence`] when the store moved past the captured
    /// generation.
    pub fn check_fresh(&self) -> TimelineResult<()> {
        let live = self.store.generation();
        if live == self.generation {
            Ok(())
        } else {
            Err(TimelineError::StaleSequence {
                captured: self.generation,
                live,
            })
        }
    }

    /// Scene for `step` from the captured sequence.
    pub fn frame(&self, step: u32) -> TimelineResult<SceneDescription> {
        self.check_fresh()?;
        let scene = self.store.frame_at(step);
        // Re-check: the read above may have raced a reset.
        self.check_fresh()?;
        scene.ok_or_else(|| {
            TimelineError::validation(format!(
                "step {step} is outside 1..={}",
                self.frame_count
            ))
        })
    }

    /// Record progress and forward it to `sink`. Values are clamped into `[0, 1]` and never
    /// move backwards.
    pub fn report(&mut self, fraction: f32, sink: &mut dyn ProgressSink) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if fraction < self.progress {
            return;
        }
        self.progress = fraction;
        sink.progress(self.kind, fraction);
    }
}

/// Everything an exporter reads: the live sequence, how to draw it, and how to name the file.
#[derive(Clone, Copy, Debug)]
pub struct ExportContext<'a> {
    /// Sequence being exported.
    pub store: &'a SceneStore,
    /// Rasterizer shared with the live view.
    pub rasterizer: &'a Rasterizer,
    /// Busy flags shared by every exporter of the session.
    pub slots: &'a ExportSlots,
    /// Background, timing, and archive settings.
    pub config: &'a TimelineConfig,
    /// Base of the generated file name.
    pub basename: &'a str,
    /// Fixed timestamp for the file name; `None` stamps with local time when the job ends.
    pub stamp: Option<NaiveDateTime>,
}

impl ExportContext<'_> {
    pub(crate) fn timestamp(&self) -> NaiveDateTime {
        self.stamp.unwrap_or_else(local_now)
    }

    /// Claim the slot for `kind` and capture the current sequence.
    pub(crate) fn begin(&self, kind: ExportKind) -> TimelineResult<(JobGuard, ExportJob)> {
        let guard = self.slots.try_begin(kind)?;
        let job = ExportJob::capture(kind, self.store)?;
        tracing::debug!(%kind, frames = job.frame_count(), "export started");
        Ok((guard, job))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/job.rs"]
mod tests;
