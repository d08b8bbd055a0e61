//! Drift-corrected countdown accounting
//!
//! Each tick subtracts the wall-clock time measured since the previous tick,
//! not the nominal tick length, so scheduler jitter never accumulates. Paused
//! ticks only move the reference point forward.

use std::time::Duration;
use tokio::time::Instant;

use super::models::RoundState;

/// What a tick crossed, evaluated on the post-decrement value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// The warning threshold was reached for the first time this round
    pub warning: bool,
    /// No time left
    pub expired: bool,
}

#[derive(Debug, Clone)]
pub struct RoundClock {
    last_tick: Instant,
    warning_threshold: f64,
    warning_latched: bool,
}

impl RoundClock {
    pub fn new(warning_threshold: f64, start: Instant) -> Self {
        Self {
            last_tick: start,
            warning_threshold,
            warning_latched: false,
        }
    }

    /// Tick while paused: nothing is counted
    pub fn checkpoint(&mut self, now: Instant) {
        self.last_tick = now;
    }

    pub fn tick(&mut self, now: Instant, round: &mut RoundState) -> TickOutcome {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.apply(elapsed, round)
    }

    fn apply(&mut self, elapsed: Duration, round: &mut RoundState) -> TickOutcome {
        round.time_remaining = (round.time_remaining - elapsed.as_secs_f64()).max(0.0);

        let warning = !self.warning_latched && round.time_remaining <= self.warning_threshold;
        if warning {
            self.warning_latched = true;
        }

        TickOutcome {
            warning,
            expired: round.time_remaining <= 0.0,
        }
    }

    pub fn warning_latched(&self) -> bool {
        self.warning_latched
    }
}
