//! Wall-clock driven playback over a 1-indexed frame sequence.
//!
//! Timestamps are host milliseconds (`f64`, like a paint-cycle clock). The controller never
//! snaps its tick reference to `now`; it advances it by whole step intervals so the fractional
//! remainder carries into the next tick and the long-run rate equals `speed` exactly.

use crate::foundation::error::{TimelineError, TimelineResult};

/// Playback state owned by [`PlaybackController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    /// Visible step, `1..=frame_count` while a sequence is bound.
    pub current_step: u32,
    /// Whether ticks advance the step.
    pub is_playing: bool,
    /// Steps per second.
    pub speed: f64,
    /// Reference timestamp (ms) the next tick measures from.
    pub last_tick_ms: f64,
}

/// Two-state (stopped / playing) playback machine.
#[derive(Clone, Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    frame_count: u32,
}

impl PlaybackController {
    /// Unbound controller playing at `speed` steps per second.
    pub fn new(speed: f64) -> TimelineResult<Self> {
        validate_speed(speed)?;
        Ok(Self {
            state: PlaybackState {
                current_step: 1,
                is_playing: false,
                speed,
                last_tick_ms: 0.0,
            },
            frame_count: 0,
        })
    }

    /// Current state snapshot.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Frame count of the bound sequence; 0 when unbound.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Whether a sequence is bound.
    pub fn is_bound(&self) -> bool {
        self.frame_count > 0
    }

    /// Bind a freshly produced sequence: stop, and park on its final step.
    ///
    /// Returns the step to render.
    pub fn bind(&mut self, frame_count: u32) -> TimelineResult<u32> {
        if frame_count == 0 {
            return Err(TimelineError::validation(
                "cannot bind playback to an empty sequence",
            ));
        }
        self.frame_count = frame_count;
        self.state.is_playing = false;
        self.state.current_step = frame_count;
        Ok(frame_count)
    }

    /// Return to the empty, pre-run condition.
    pub fn unbind(&mut self) {
        self.frame_count = 0;
        self.state.is_playing = false;
        self.state.current_step = 1;
    }

    /// Change playback speed; takes effect from the next tick.
    pub fn set_speed(&mut self, speed: f64) -> TimelineResult<()> {
        validate_speed(speed)?;
        self.state.speed = speed;
        Ok(())
    }

    /// Stop without moving the current step.
    pub fn stop(&mut self) {
        self.state.is_playing = false;
    }

    /// Toggle between stopped and playing.
    ///
    /// Starting from the final step rewinds to step 1 first. Returns the step to render when
    /// the toggle moved the current step.
    pub fn toggle_play(&mut self, now_ms: f64) -> Option<u32> {
        if !self.is_bound() {
            return None;
        }
        if self.state.is_playing {
            self.state.is_playing = false;
            return None;
        }

        self.state.is_playing = true;
        self.state.last_tick_ms = now_ms;
        if self.state.current_step >= self.frame_count {
            self.state.current_step = 1;
            return Some(1);
        }
        None
    }

    /// Advance by however many whole step intervals elapsed since the last reference time.
    ///
    /// No-op while stopped. Returns the step to render when the step changed; reaching the
    /// final step stops playback.
    pub fn tick(&mut self, now_ms: f64) -> Option<u32> {
        if !self.state.is_playing || !self.is_bound() {
            return None;
        }

        let elapsed = now_ms - self.state.last_tick_ms;
        let interval = 1000.0 / self.state.speed;
        if !(elapsed.is_finite() && elapsed > 0.0) {
            return None;
        }
        let steps = (elapsed / interval).floor();
        if steps < 1.0 {
            return None;
        }

        self.state.last_tick_ms += steps * interval;
        let next = u64::from(self.state.current_step).saturating_add(steps as u64);
        self.state.current_step = next.min(u64::from(self.frame_count)) as u32;
        if self.state.current_step == self.frame_count {
            self.state.is_playing = false;
        }
        Some(self.state.current_step)
    }

    /// Jump to `step`, clamped into `1..=frame_count`. Does not change the play flag.
    ///
    /// Returns the step to render, or `None` when unbound.
    pub fn seek(&mut self, step: i64) -> Option<u32> {
        if !self.is_bound() {
            return None;
        }
        let clamped = step.clamp(1, i64::from(self.frame_count)) as u32;
        self.state.current_step = clamped;
        Some(clamped)
    }
}

fn validate_speed(speed: f64) -> TimelineResult<()> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(TimelineError::validation(format!(
            "playback speed must be a positive number, got {speed}"
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
