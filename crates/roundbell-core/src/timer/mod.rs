mod clock;
mod config;
mod phase;
mod preset;
mod state;

pub use clock::PhaseClock;
pub use config::{
    EngineOptions, TimerConfig, TimerConfigPatch, DEFAULT_TICK_INTERVAL, PREP_DURATION_SECS,
    REST_DURATION_SECS, TICK_INTERVAL_MS, TOTAL_ROUNDS, WARNING_THRESHOLD_SECS,
    WORK_DURATION_SECS,
};
pub use phase::{Phase, PhaseMachine, Transition};
pub use preset::Preset;
pub use state::TimerState;
