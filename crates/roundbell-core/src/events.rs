use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::timer::{Phase, TimerState};

/// Every state change in the engine produces an event.
///
/// On the wire an event is a flat object: `{"type": ..., <fields>,
/// "stateSnapshot": {...}, "timestamp": <ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(rename = "stateSnapshot")]
    pub state: TimerState,
    /// Monotonic milliseconds since the scheduler was spawned.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    /// Scheduler loop is up and accepting commands.
    Ready,
    Started,
    PreparationStart,
    PhaseChange {
        old: Phase,
        new: Phase,
        round: u32,
    },
    Tick {
        remaining: u64,
        elapsed: u64,
        progress: f64,
    },
    Warning {
        phase: Phase,
        remaining: u64,
    },
    RoundComplete {
        round: u32,
    },
    WorkoutComplete {
        rounds: u32,
    },
    Paused,
    Resumed,
    Stopped,
    Reset,
    /// Answer to a `status` query.
    Status,
    Error {
        kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Started => "started",
            EventKind::PreparationStart => "preparationStart",
            EventKind::PhaseChange { .. } => "phaseChange",
            EventKind::Tick { .. } => "tick",
            EventKind::Warning { .. } => "warning",
            EventKind::RoundComplete { .. } => "roundComplete",
            EventKind::WorkoutComplete { .. } => "workoutComplete",
            EventKind::Paused => "paused",
            EventKind::Resumed => "resumed",
            EventKind::Stopped => "stopped",
            EventKind::Reset => "reset",
            EventKind::Status => "status",
            EventKind::Error { .. } => "error",
        }
    }
}

impl TimerEvent {
    pub fn new(kind: EventKind, state: TimerState, timestamp: u64) -> Self {
        Self {
            kind,
            state,
            timestamp,
        }
    }

    /// Tick event for a snapshot. Ticks and `status` share this snapshot.
    pub fn tick(state: TimerState, timestamp: u64) -> Self {
        Self::new(
            EventKind::Tick {
                remaining: state.remaining,
                elapsed: state.elapsed,
                progress: state.progress,
            },
            state,
            timestamp,
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::Error { .. })
    }
}
