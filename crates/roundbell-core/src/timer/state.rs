use serde::{Deserialize, Serialize};

use super::config::TimerConfig;
use super::phase::{Phase, PhaseMachine};

/// Immutable snapshot of the timer, as carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub phase: Phase,
    /// Phase that resumes after a pause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_phase: Option<Phase>,
    pub current_round: u32,
    pub total_rounds: u32,
    /// Milliseconds of running time in the current phase.
    pub elapsed: u64,
    /// Milliseconds the current phase lasts.
    pub duration: u64,
    /// Milliseconds left; always `duration - elapsed`.
    pub remaining: u64,
    /// 0.0 ..= 1.0 within the current phase.
    pub progress: f64,
    pub is_running: bool,
    pub is_paused: bool,
}

impl TimerState {
    /// Idle snapshot for a configuration, before any run.
    pub fn idle(config: &TimerConfig) -> Self {
        Self::capture(&PhaseMachine::new(), config, 0)
    }

    /// Build the snapshot for a machine at a given phase-elapsed time.
    ///
    /// Elapsed is clamped to the phase duration so that
    /// `elapsed + remaining == duration` holds even on an overrunning tick.
    pub fn capture(machine: &PhaseMachine, config: &TimerConfig, elapsed_ms: u64) -> Self {
        let duration = machine.phase_ms(config);
        let (elapsed, remaining) = match machine.active_phase() {
            Phase::Idle => (0, duration),
            Phase::Complete => (duration, 0),
            _ => {
                let elapsed = elapsed_ms.min(duration);
                (elapsed, duration - elapsed)
            }
        };
        let progress = if duration == 0 {
            0.0
        } else {
            elapsed as f64 / duration as f64
        };
        Self {
            phase: machine.phase(),
            paused_phase: machine.paused_from(),
            current_round: machine.round(),
            total_rounds: config.total_rounds,
            elapsed,
            duration,
            remaining,
            progress,
            is_running: machine.is_ticking(),
            is_paused: machine.is_paused(),
        }
    }
}
