use crate::foundation::core::Rgba8;
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::playback::controller::{PlaybackController, PlaybackState};
use crate::render::raster::{RasterOptions, Rasterizer};
use crate::render::surface::Surface;
use crate::sequence::store::SceneStore;

/// Live display: a [`PlaybackController`] plus the surface showing its current step.
///
/// Render failures during playback are logged and swallowed; the surface keeps the last frame
/// that rendered successfully and ticking continues.
#[derive(Debug)]
pub struct Viewer {
    store: SceneStore,
    controller: PlaybackController,
    background: Option<Rgba8>,
    surface: Option<Surface>,
    scratch: Option<Surface>,
    shown_step: Option<u32>,
}

impl Viewer {
    /// Viewer over `store`, playing at `speed` steps per second.
    pub fn new(store: SceneStore, speed: f64) -> TimelineResult<Self> {
        Ok(Self {
            store,
            controller: PlaybackController::new(speed)?,
            background: None,
            surface: None,
            scratch: None,
            shown_step: None,
        })
    }

    /// Backdrop for the live display; `None` shows the scene over transparency.
    pub fn set_background(&mut self, background: Option<Rgba8>) {
        self.background = background;
    }

    /// Playback state snapshot.
    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Mutable access to the controller (speed changes, stop).
    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    /// Step currently on the surface, if any frame has rendered.
    pub fn shown_step(&self) -> Option<u32> {
        self.shown_step
    }

    /// Surface holding the last rendered frame.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Bind to the store's current sequence and show its final step.
    pub fn bind(&mut self, rasterizer: &Rasterizer) -> TimelineResult<()> {
        let step = self.controller.bind(self.store.frame_count())?;
        self.show(step, rasterizer);
        Ok(())
    }

    /// Drop the bound sequence and blank the display.
    pub fn unbind(&mut self) {
        self.controller.unbind();
        self.surface = None;
        self.scratch = None;
        self.shown_step = None;
    }

    /// Seek to `step` (clamped) and render it immediately.
    pub fn seek(&mut self, step: i64, rasterizer: &Rasterizer) -> Option<u32> {
        let step = self.controller.seek(step)?;
        self.show(step, rasterizer);
        Some(step)
    }

    /// Toggle play / pause at host time `now_ms`.
    pub fn toggle_play(&mut self, now_ms: f64, rasterizer: &Rasterizer) {
        if let Some(step) = self.controller.toggle_play(now_ms) {
            self.show(step, rasterizer);
        }
    }

    /// Host paint-cycle hook; call every frame regardless of state.
    pub fn tick(&mut self, now_ms: f64, rasterizer: &Rasterizer) -> Option<u32> {
        let step = self.controller.tick(now_ms)?;
        self.show(step, rasterizer);
        Some(step)
    }

    fn show(&mut self, step: u32, rasterizer: &Rasterizer) {
        if let Err(e) = self.render(step, rasterizer) {
            tracing::warn!(step, error = %e, "playback render failed; keeping previous frame");
        }
    }

    fn render(&mut self, step: u32, rasterizer: &Rasterizer) -> TimelineResult<()> {
        let scene = self.store.frame_at(step).ok_or_else(|| {
            TimelineError::rasterization(format!("step {step} is not in the sequence"))
        })?;
        let opts = RasterOptions {
            background: self.background,
            resize_surface: true,
        };

        // Draw off to the side so a failed decode leaves the shown frame intact.
        let mut next = match self.scratch.take() {
            Some(s) => s,
            None => rasterizer.surface_for(&scene)?,
        };
        let result = rasterizer.rasterize(&scene, &mut next, &opts);
        if result.is_ok() {
            self.scratch = self.surface.replace(next);
            self.shown_step = Some(step);
        } else {
            self.scratch = Some(next);
        }
        result
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/viewer.rs"]
mod tests;
