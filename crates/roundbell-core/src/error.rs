//! Core error types for roundbell-core.
//!
//! Errors raised on the caller's side of the engine (configuration checks,
//! illegal commands, a dead scheduler) are returned synchronously. Errors raised
//! inside the scheduler never cross the boundary as values; they are reported
//! as `error` events tagged with an [`ErrorKind`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timer::Phase;

/// Core error type for roundbell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timer configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Engine command errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Settings file errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid timer configuration. Always raised before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A bounded field is outside its accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// No preset with this name
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Configuration mutation attempted during a run
    #[error("cannot change settings while running")]
    SessionActive,

    /// Scheduler tick period outside the supported range
    #[error("tick interval must be between {min_ms} and {max_ms} ms, got {value_ms} ms")]
    InvalidTickInterval {
        value_ms: u64,
        min_ms: u64,
        max_ms: u64,
    },
}

/// Errors returned by the engine facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Command is not legal in the current phase
    #[error("cannot {command} while {phase}")]
    InvalidState { command: &'static str, phase: Phase },

    /// The background scheduler is gone; the engine must be respawned
    #[error("timer engine is unavailable")]
    Unavailable,

    /// Inbound message with an unrecognised type
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl EngineError {
    /// Wire-level classification used in `error` events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Configuration(_) => ErrorKind::Configuration,
            EngineError::InvalidState { .. } => ErrorKind::InvalidState,
            EngineError::Unavailable => ErrorKind::EngineUnavailable,
            EngineError::UnknownCommand(_) => ErrorKind::UnknownCommand,
        }
    }
}

/// Classification carried by `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Configuration,
    InvalidState,
    UnknownCommand,
    EngineUnavailable,
}

/// Settings file errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to load settings
    #[error("Failed to load settings from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save settings
    #[error("Failed to save settings to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Dot-path key does not name a settings field
    #[error("unknown settings key: {0}")]
    UnknownKey(String),

    /// Value could not be converted to the field's type
    #[error("Invalid settings value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_active_message_is_user_facing() {
        assert_eq!(
            ConfigurationError::SessionActive.to_string(),
            "cannot change settings while running"
        );
    }

    #[test]
    fn engine_error_kinds() {
        assert_eq!(EngineError::Unavailable.kind(), ErrorKind::EngineUnavailable);
        assert_eq!(
            EngineError::UnknownCommand("bogus".into()).kind(),
            ErrorKind::UnknownCommand
        );
        assert_eq!(
            EngineError::from(ConfigurationError::SessionActive).kind(),
            ErrorKind::Configuration
        );
        let err = EngineError::InvalidState {
            command: "start",
            phase: Phase::Working,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.to_string(), "cannot start while working");
    }
}
