//! Drift-free phase clock.
//!
//! Elapsed time is always recomputed from a fixed anchor:
//! `elapsed = now - reference - paused_total`. Nothing is accumulated per tick,
//! so late or skipped ticks never shift the countdown. Uses the monotonic
//! tokio clock only; wall-clock time is never consulted.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseClock {
    reference: Instant,
    paused_total: Duration,
    pause_started: Option<Instant>,
}

impl PhaseClock {
    pub fn start(now: Instant) -> Self {
        Self {
            reference: now,
            paused_total: Duration::ZERO,
            pause_started: None,
        }
    }

    /// Running time since the anchor. Frozen while paused.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let end = self.pause_started.unwrap_or(now);
        end.saturating_duration_since(self.reference)
            .saturating_sub(self.paused_total)
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        self.elapsed(now).as_millis() as u64
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started.is_some()
    }

    pub fn pause(&mut self, now: Instant) {
        if self.pause_started.is_none() {
            self.pause_started = Some(now);
        }
    }

    /// Adds the pause interval to `paused_total`; the anchor is untouched.
    pub fn resume(&mut self, now: Instant) {
        if let Some(started) = self.pause_started.take() {
            self.paused_total += now.saturating_duration_since(started);
        }
    }

    /// Re-anchor for the next phase at the exact instant the current one ended.
    ///
    /// Time that overran the phase boundary is carried into the next phase
    /// instead of being dropped.
    pub fn roll_over(&mut self, phase_length: Duration) {
        self.reference += self.paused_total + phase_length;
        self.paused_total = Duration::ZERO;
    }
}
