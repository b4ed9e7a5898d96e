//! Playback cursor over a precomputed history.
//!
//! The controller only decides how much of the history is revealed; it never
//! touches the projection. While running it owns exactly one interval timer,
//! which is dropped on pause, reset, speed change, a switch to the annual view
//! or when the controller itself is dropped.

use serde::Serialize;
use sim_core::{Granularity, MAX_MONTHS};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Default interval between playback ticks.
pub const DEFAULT_SPEED_MS: u64 = 500;

/// Observable playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Zero-based cursor into the monthly history.
    pub current_month: usize,
    pub is_running: bool,
    pub granularity: Granularity,
    pub speed_ms: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_month: 0,
            is_running: false,
            granularity: Granularity::Monthly,
            speed_ms: DEFAULT_SPEED_MS,
        }
    }
}

/// Play/pause/step/reset state machine.
#[derive(Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    last_month: usize,
    timer: Option<Interval>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(MAX_MONTHS)
    }
}

impl PlaybackController {
    /// Controller for a history of `months` points.
    pub fn new(months: usize) -> Self {
        Self {
            state: PlaybackState::default(),
            last_month: months.saturating_sub(1),
            timer: None,
        }
    }

    pub fn with_speed(mut self, speed_ms: u64) -> Self {
        self.state.speed_ms = speed_ms.max(1);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_month(&self) -> usize {
        self.state.current_month
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn granularity(&self) -> Granularity {
        self.state.granularity
    }

    /// Whether a tick timer is currently armed.
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Begin playback. Returns `false` when already running or in the annual view.
    pub fn start(&mut self) -> bool {
        if self.state.is_running || self.state.granularity == Granularity::Annual {
            return false;
        }
        self.state.is_running = true;
        debug!(month = self.state.current_month, "playback started");
        true
    }

    /// Stop playback, keeping the cursor where it is.
    pub fn pause(&mut self) {
        self.timer = None;
        if self.state.is_running {
            self.state.is_running = false;
            debug!(month = self.state.current_month, "playback paused");
        }
    }

    /// Advance the cursor by one month, pausing first if running.
    pub fn step(&mut self) -> usize {
        self.pause();
        self.state.current_month = (self.state.current_month + 1).min(self.last_month);
        self.state.current_month
    }

    /// Pause and rewind to the first month.
    pub fn reset(&mut self) {
        self.pause();
        self.state.current_month = 0;
    }

    /// Apply one timer tick. Ignored unless running; stops on the last month.
    pub fn tick(&mut self) -> usize {
        if !self.state.is_running {
            return self.state.current_month;
        }
        if self.state.current_month < self.last_month {
            self.state.current_month += 1;
        }
        if self.state.current_month >= self.last_month {
            self.pause();
        }
        self.state.current_month
    }

    /// Change the tick interval. The cursor is untouched; future ticks use the new speed.
    pub fn set_speed(&mut self, speed_ms: u64) {
        self.state.speed_ms = speed_ms.max(1);
        self.timer = None;
    }

    /// Switch views. The annual view has no cursor, so switching to it pauses
    /// and rewinds; switching back to monthly does not resume.
    pub fn set_granularity(&mut self, granularity: Granularity) {
        if granularity == Granularity::Annual {
            self.reset();
        }
        self.state.granularity = granularity;
    }

    /// Wait for the next tick and apply it.
    ///
    /// Returns `None` immediately when not running. The timer is armed lazily
    /// on first use so that no runtime is needed to drive the state machine
    /// synchronously.
    pub async fn next_tick(&mut self) -> Option<usize> {
        if !self.state.is_running {
            self.timer = None;
            return None;
        }
        let period = Duration::from_millis(self.state.speed_ms);
        let timer = self.timer.get_or_insert_with(|| {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });
        timer.tick().await;
        Some(self.tick())
    }
}
