//! Pure phase transition logic.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> (Preparing) -> Working -> Resting -> Working -> ... -> Working -> Complete
//!
//! Preparing | Working | Resting  <->  Paused
//! any                             ->  Idle   (stop)
//! ```
//!
//! The machine knows nothing about clocks. The scheduler tells it when the
//! current phase has run out and turns the returned [`Transition`]s into events.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::TimerConfig;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "prep")]
    Preparing,
    #[serde(rename = "work")]
    Working,
    #[serde(rename = "rest")]
    Resting,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "complete")]
    Complete,
}

impl Phase {
    /// Phases whose clock advances.
    pub fn is_timed(&self) -> bool {
        matches!(self, Phase::Preparing | Phase::Working | Phase::Resting)
    }

    /// Configuration may only change in these phases.
    pub fn is_settled(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Complete)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Preparing => "preparing",
            Phase::Working => "working",
            Phase::Resting => "resting",
            Phase::Paused => "paused",
            Phase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Outcome of a single machine step, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The run opened with a preparation phase.
    Prepare,
    PhaseChange { old: Phase, new: Phase, round: u32 },
    /// The work phase of `round` ran out.
    RoundComplete { round: u32 },
    WorkoutComplete { rounds: u32 },
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: Phase,
    /// Phase to return to on resume. Only set while paused.
    paused_from: Option<Phase>,
    round: u32,
    warning_armed: bool,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            paused_from: None,
            round: 1,
            warning_armed: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The phase whose duration is on display; the frozen one while paused.
    pub fn active_phase(&self) -> Phase {
        self.paused_from.unwrap_or(self.phase)
    }

    pub fn paused_from(&self) -> Option<Phase> {
        self.paused_from
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_ticking(&self) -> bool {
        self.phase.is_timed()
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    /// Length of the active phase in milliseconds.
    ///
    /// Idle reports the first phase of the next run so that a stopped timer
    /// shows a full countdown rather than zero.
    pub fn phase_ms(&self, config: &TimerConfig) -> u64 {
        match self.active_phase() {
            Phase::Idle => config.first_phase_ms(),
            Phase::Preparing => config.prep_ms(),
            Phase::Working | Phase::Complete => config.work_ms(),
            Phase::Resting => config.rest_ms(),
            Phase::Paused => 0,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run from Idle or Complete.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` from any other phase; the machine is unchanged.
    pub fn start(&mut self, config: &TimerConfig) -> Result<Vec<Transition>, EngineError> {
        if !self.phase.is_settled() {
            return Err(EngineError::InvalidState {
                command: "start",
                phase: self.phase,
            });
        }
        let old = self.phase;
        self.round = 1;
        self.paused_from = None;
        if config.has_preparation() {
            self.enter(Phase::Preparing, config);
            Ok(vec![Transition::Prepare])
        } else {
            self.enter(Phase::Working, config);
            Ok(vec![Transition::PhaseChange {
                old,
                new: Phase::Working,
                round: 1,
            }])
        }
    }

    /// The active phase has run out. Never adds a rest after the final round.
    pub fn expire(&mut self, config: &TimerConfig) -> Vec<Transition> {
        let round = self.round;
        match self.phase {
            Phase::Preparing => {
                self.enter(Phase::Working, config);
                vec![Transition::PhaseChange {
                    old: Phase::Preparing,
                    new: Phase::Working,
                    round,
                }]
            }
            Phase::Working if round >= config.total_rounds => {
                self.enter(Phase::Complete, config);
                vec![
                    Transition::RoundComplete { round },
                    Transition::PhaseChange {
                        old: Phase::Working,
                        new: Phase::Complete,
                        round,
                    },
                    Transition::WorkoutComplete {
                        rounds: config.total_rounds,
                    },
                ]
            }
            Phase::Working => {
                self.enter(Phase::Resting, config);
                vec![
                    Transition::RoundComplete { round },
                    Transition::PhaseChange {
                        old: Phase::Working,
                        new: Phase::Resting,
                        round,
                    },
                ]
            }
            Phase::Resting => {
                self.round = round + 1;
                self.enter(Phase::Working, config);
                vec![Transition::PhaseChange {
                    old: Phase::Resting,
                    new: Phase::Working,
                    round: self.round,
                }]
            }
            Phase::Idle | Phase::Paused | Phase::Complete => Vec::new(),
        }
    }

    /// Returns false when there is nothing to pause.
    pub fn pause(&mut self) -> bool {
        if !self.is_ticking() {
            return false;
        }
        self.paused_from = Some(self.phase);
        self.phase = Phase::Paused;
        true
    }

    /// Returns false when not paused.
    pub fn resume(&mut self) -> bool {
        match self.paused_from.take() {
            Some(phase) => {
                self.phase = phase;
                true
            }
            None => false,
        }
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.paused_from = None;
        self.round = 1;
        self.warning_armed = false;
    }

    /// Fires at most once per phase entry.
    pub fn take_warning(&mut self, remaining_ms: u64, config: &TimerConfig) -> bool {
        if self.warning_armed && self.is_ticking() && remaining_ms <= config.warning_threshold_ms() {
            self.warning_armed = false;
            return true;
        }
        false
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter(&mut self, phase: Phase, config: &TimerConfig) {
        self.phase = phase;
        self.warning_armed = config.enable_warning
            && phase.is_timed()
            && self.phase_ms(config) > config.warning_threshold_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(rounds: u32, prep: u32) -> TimerConfig {
        TimerConfig {
            total_rounds: rounds,
            work_duration: 120,
            rest_duration: 60,
            prep_duration: prep,
            enable_warning: true,
            warning_threshold: 10,
        }
    }

    fn run_to_completion(machine: &mut PhaseMachine, config: &TimerConfig) -> Vec<Transition> {
        let mut all = machine.start(config).unwrap();
        while machine.phase() != Phase::Complete {
            let step = machine.expire(config);
            assert!(!step.is_empty(), "stalled in {:?}", machine.phase());
            all.extend(step);
        }
        all
    }

    #[test]
    fn start_without_prep_enters_work() {
        let mut machine = PhaseMachine::new();
        let transitions = machine.start(&config(3, 0)).unwrap();
        assert_eq!(
            transitions,
            vec![Transition::PhaseChange {
                old: Phase::Idle,
                new: Phase::Working,
                round: 1
            }]
        );
        assert_eq!(machine.phase(), Phase::Working);
        assert_eq!(machine.round(), 1);
    }

    #[test]
    fn start_with_prep_enters_preparation() {
        let cfg = config(3, 10);
        let mut machine = PhaseMachine::new();
        assert_eq!(machine.start(&cfg).unwrap(), vec![Transition::Prepare]);
        assert_eq!(machine.phase(), Phase::Preparing);
        assert_eq!(machine.phase_ms(&cfg), 10_000);
        assert_eq!(
            machine.expire(&cfg),
            vec![Transition::PhaseChange {
                old: Phase::Preparing,
                new: Phase::Working,
                round: 1
            }]
        );
    }

    #[test]
    fn start_rejected_while_running() {
        let cfg = config(3, 0);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        let err = machine.start(&cfg).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidState {
                command: "start",
                phase: Phase::Working
            }
        );
        machine.pause();
        assert!(machine.start(&cfg).is_err());
    }

    #[test]
    fn single_round_completes_without_rest() {
        let cfg = config(1, 0);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        let transitions = machine.expire(&cfg);
        assert_eq!(
            transitions,
            vec![
                Transition::RoundComplete { round: 1 },
                Transition::PhaseChange {
                    old: Phase::Working,
                    new: Phase::Complete,
                    round: 1
                },
                Transition::WorkoutComplete { rounds: 1 },
            ]
        );
        assert!(machine.expire(&cfg).is_empty());
    }

    #[test]
    fn rest_leads_to_next_round() {
        let cfg = config(3, 0);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        machine.expire(&cfg);
        assert_eq!(machine.phase(), Phase::Resting);
        assert_eq!(machine.round(), 1);
        let transitions = machine.expire(&cfg);
        assert_eq!(
            transitions,
            vec![Transition::PhaseChange {
                old: Phase::Resting,
                new: Phase::Working,
                round: 2
            }]
        );
    }

    #[test]
    fn pause_and_resume_restore_phase() {
        let cfg = config(3, 0);
        let mut machine = PhaseMachine::new();
        assert!(!machine.pause());
        assert!(!machine.resume());

        machine.start(&cfg).unwrap();
        machine.expire(&cfg);
        assert!(machine.pause());
        assert!(!machine.pause());
        assert_eq!(machine.phase(), Phase::Paused);
        assert_eq!(machine.active_phase(), Phase::Resting);
        assert_eq!(machine.phase_ms(&cfg), 60_000);
        assert!(machine.expire(&cfg).is_empty());

        assert!(machine.resume());
        assert_eq!(machine.phase(), Phase::Resting);
        assert_eq!(machine.paused_from(), None);
    }

    #[test]
    fn stop_returns_to_round_one() {
        let cfg = config(3, 10);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        machine.expire(&cfg);
        machine.expire(&cfg);
        machine.expire(&cfg);
        assert_eq!(machine.round(), 2);
        machine.pause();
        machine.stop();
        assert_eq!(machine.phase(), Phase::Idle);
        assert_eq!(machine.round(), 1);
        assert_eq!(machine.phase_ms(&cfg), 10_000);
    }

    #[test]
    fn warning_fires_once_per_phase() {
        let cfg = config(2, 0);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        assert!(!machine.take_warning(11_000, &cfg));
        assert!(machine.take_warning(10_000, &cfg));
        assert!(!machine.take_warning(5_000, &cfg));
        machine.expire(&cfg);
        assert!(machine.take_warning(9_900, &cfg));
    }

    #[test]
    fn warning_not_armed_for_short_phase_or_when_disabled() {
        let mut cfg = config(2, 10);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        // 10s prep does not exceed the 10s threshold
        assert!(!machine.take_warning(0, &cfg));

        cfg.enable_warning = false;
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        machine.expire(&cfg);
        assert!(!machine.take_warning(0, &cfg));
    }

    #[test]
    fn warning_suppressed_while_paused() {
        let cfg = config(2, 0);
        let mut machine = PhaseMachine::new();
        machine.start(&cfg).unwrap();
        machine.pause();
        assert!(!machine.take_warning(1_000, &cfg));
        machine.resume();
        assert!(machine.take_warning(1_000, &cfg));
    }

    proptest! {
        #[test]
        fn phase_sequence_alternates(rounds in 1u32..=20, prep in 0u32..=60) {
            let cfg = config(rounds, prep);
            let mut machine = PhaseMachine::new();
            let transitions = run_to_completion(&mut machine, &cfg);

            let entered: Vec<Phase> = transitions
                .iter()
                .filter_map(|t| match t {
                    Transition::PhaseChange { new, .. } => Some(*new),
                    _ => None,
                })
                .collect();
            let work = entered.iter().filter(|p| **p == Phase::Working).count();
            let rest = entered.iter().filter(|p| **p == Phase::Resting).count();
            prop_assert_eq!(work as u32, rounds);
            prop_assert_eq!(rest as u32, rounds - 1);
            prop_assert_eq!(entered.last().copied(), Some(Phase::Complete));
            for pair in entered.windows(2) {
                let ok = matches!(
                    (pair[0], pair[1]),
                    (Phase::Working, Phase::Resting)
                        | (Phase::Resting, Phase::Working)
                        | (Phase::Working, Phase::Complete)
                );
                prop_assert!(ok, "bad order {:?}", pair);
            }
            prop_assert_eq!(
                transitions.iter().filter(|t| matches!(t, Transition::Prepare)).count(),
                usize::from(prep > 0)
            );
            prop_assert_eq!(machine.round(), rounds);
        }

        #[test]
        fn round_stays_in_range(rounds in 1u32..=20, steps in 0usize..80) {
            let cfg = config(rounds, 0);
            let mut machine = PhaseMachine::new();
            machine.start(&cfg).unwrap();
            for _ in 0..steps {
                machine.expire(&cfg);
                prop_assert!(machine.round() >= 1 && machine.round() <= rounds);
            }
        }
    }
}
