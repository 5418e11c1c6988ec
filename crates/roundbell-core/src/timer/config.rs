//! Workout configuration and its bounds.
//!
//! Bounds are enforced here regardless of where a value came from (presets,
//! the settings file, a wire message). A phase shorter than the minimum is
//! rejected outright, never treated as instantaneous.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

pub const WORK_DURATION_SECS: (u32, u32) = (10, 600);
pub const REST_DURATION_SECS: (u32, u32) = (10, 300);
pub const TOTAL_ROUNDS: (u32, u32) = (1, 20);
pub const PREP_DURATION_SECS: (u32, u32) = (0, 60);
pub const WARNING_THRESHOLD_SECS: (u32, u32) = (1, 60);

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const TICK_INTERVAL_MS: (u64, u64) = (10, 250);

/// A complete, validated-on-demand workout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub total_rounds: u32,
    /// Seconds.
    pub work_duration: u32,
    /// Seconds.
    pub rest_duration: u32,
    /// Seconds. Zero skips the preparation phase.
    #[serde(default)]
    pub prep_duration: u32,
    #[serde(default = "default_true")]
    pub enable_warning: bool,
    /// Seconds before phase end.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: u32,
}

fn default_true() -> bool {
    true
}

fn default_warning_threshold() -> u32 {
    10
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            total_rounds: 3,
            work_duration: 180,
            rest_duration: 60,
            prep_duration: 10,
            enable_warning: true,
            warning_threshold: default_warning_threshold(),
        }
    }
}

impl TimerConfig {
    /// Check every bounded field.
    ///
    /// # Errors
    ///
    /// Returns the first field found outside its range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check("totalRounds", self.total_rounds, TOTAL_ROUNDS)?;
        check("workDuration", self.work_duration, WORK_DURATION_SECS)?;
        check("restDuration", self.rest_duration, REST_DURATION_SECS)?;
        check("prepDuration", self.prep_duration, PREP_DURATION_SECS)?;
        check("warningThreshold", self.warning_threshold, WARNING_THRESHOLD_SECS)?;
        Ok(())
    }

    pub fn has_preparation(&self) -> bool {
        self.prep_duration > 0
    }

    pub fn work_ms(&self) -> u64 {
        u64::from(self.work_duration) * 1000
    }

    pub fn rest_ms(&self) -> u64 {
        u64::from(self.rest_duration) * 1000
    }

    pub fn prep_ms(&self) -> u64 {
        u64::from(self.prep_duration) * 1000
    }

    pub fn warning_threshold_ms(&self) -> u64 {
        u64::from(self.warning_threshold) * 1000
    }

    /// Length of the first timed phase of a run.
    pub fn first_phase_ms(&self) -> u64 {
        if self.has_preparation() {
            self.prep_ms()
        } else {
            self.work_ms()
        }
    }

    /// Total running time of a full workout, preparation included.
    pub fn total_ms(&self) -> u64 {
        let rounds = u64::from(self.total_rounds);
        self.prep_ms() + rounds * self.work_ms() + rounds.saturating_sub(1) * self.rest_ms()
    }

    /// Apply a partial update and validate the result.
    ///
    /// `self` is left untouched when the merged configuration is invalid.
    pub fn merged(&self, patch: &TimerConfigPatch) -> Result<Self, ConfigurationError> {
        let merged = Self {
            total_rounds: patch.total_rounds.unwrap_or(self.total_rounds),
            work_duration: patch.work_duration.unwrap_or(self.work_duration),
            rest_duration: patch.rest_duration.unwrap_or(self.rest_duration),
            prep_duration: patch.prep_duration.unwrap_or(self.prep_duration),
            enable_warning: patch.enable_warning.unwrap_or(self.enable_warning),
            warning_threshold: patch.warning_threshold.unwrap_or(self.warning_threshold),
        };
        merged.validate()?;
        Ok(merged)
    }
}

fn check(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), ConfigurationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            field,
            value: u64::from(value),
            min: u64::from(min),
            max: u64::from(max),
        })
    }
}

/// Partial configuration update. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_warning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<u32>,
}

impl TimerConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Engine construction options that are not part of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Scheduler tick period. Must stay below the required display precision.
    pub tick_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl EngineOptions {
    pub fn with_tick_interval_ms(ms: u64) -> Result<Self, ConfigurationError> {
        let options = Self {
            tick_interval: Duration::from_millis(ms),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let value_ms = self.tick_interval.as_millis() as u64;
        let (min_ms, max_ms) = TICK_INTERVAL_MS;
        if (min_ms..=max_ms).contains(&value_ms) {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidTickInterval {
                value_ms,
                min_ms,
                max_ms,
            })
        }
    }
}
