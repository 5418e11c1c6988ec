//! Audio cue mapping.
//!
//! Sound collaborators subscribe to the event stream and ask [`cues_for`]
//! which sounds an event calls for. Playback itself lives outside the core.

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, TimerEvent};
use crate::timer::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    GetReady,
    Bell,
    RoundStart,
    RoundEnd,
    Rest,
    TenSecondWarning,
    WorkoutComplete,
    Celebration,
}

/// Cues to play for an event, in playback order.
pub fn cues_for(event: &TimerEvent) -> Vec<Cue> {
    match &event.kind {
        EventKind::PreparationStart => vec![Cue::GetReady],
        EventKind::PhaseChange {
            new: Phase::Working,
            ..
        } => vec![Cue::Bell, Cue::RoundStart],
        EventKind::PhaseChange {
            new: Phase::Resting,
            ..
        } => vec![Cue::RoundEnd, Cue::Rest],
        EventKind::Warning { .. } => vec![Cue::TenSecondWarning],
        EventKind::WorkoutComplete { .. } => vec![Cue::WorkoutComplete, Cue::Celebration],
        _ => Vec::new(),
    }
}
