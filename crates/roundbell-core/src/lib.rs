//! # Roundbell Core Library
//!
//! Drift-corrected interval timer for boxing-style workouts: optional
//! preparation, then alternating work and rest rounds, ending in a completed
//! state.
//!
//! ## Architecture
//!
//! - **Phase machine**: pure transition logic over Idle, Preparing, Working,
//!   Resting, Paused and Complete
//! - **Clock**: remaining time is always derived from a monotonic reference
//!   minus paused time, never from counting ticks
//! - **Scheduler**: a tokio task that owns the machine and the clock and
//!   talks to the outside world only through commands and event batches
//! - **Facade**: [`TimerEngine`], the public API for UI and audio collaborators
//! - **Storage**: TOML user settings
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: start/pause/resume/stop/reset, presets, subscriptions
//! - [`TimerEvent`]: every state change, carrying a [`TimerState`] snapshot
//! - [`TimerConfig`] and [`Preset`]: validated workout definitions
//! - [`cues_for`]: which sounds an event calls for

pub mod cues;
pub mod engine;
pub mod error;
pub mod events;
pub mod protocol;
pub mod scheduler;
pub mod storage;
pub mod timer;

pub use cues::{cues_for, Cue};
pub use engine::{Subscription, TimerEngine};
pub use error::{ConfigurationError, CoreError, EngineError, ErrorKind, SettingsError};
pub use events::{EventKind, TimerEvent};
pub use protocol::{Command, InboundMessage};
pub use storage::Settings;
pub use timer::{EngineOptions, Phase, Preset, TimerConfig, TimerConfigPatch, TimerState};
