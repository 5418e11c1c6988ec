//! TOML user settings.
//!
//! Stores the workout the CLI and collaborators run by default, the scheduler
//! tick period and audio preferences:
//!
//! ```toml
//! [timer]
//! preset = "beginner"     # empty string: use the explicit values below
//! total_rounds = 3
//! work_duration = 180
//! rest_duration = 60
//! prep_duration = 10
//! enable_warning = true
//! warning_threshold = 10
//!
//! [engine]
//! tick_interval_ms = 100
//!
//! [audio]
//! enabled = true
//! volume = 80
//! ```
//!
//! Stored at `<config dir>/roundbell/config.toml` (see [`super::config_dir`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::settings_path;
use crate::error::{ConfigurationError, SettingsError};
use crate::timer::{EngineOptions, Preset, TimerConfig, DEFAULT_TICK_INTERVAL};

const MAX_VOLUME: u32 = 100;

const SECTIONS: [&str; 3] = ["timer", "engine", "audio"];

/// Workout section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Preset name; when set it wins over the explicit values.
    #[serde(default)]
    pub preset: String,
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_rest_duration")]
    pub rest_duration: u32,
    #[serde(default = "default_prep_duration")]
    pub prep_duration: u32,
    #[serde(default = "default_true")]
    pub enable_warning: bool,
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Read by audio collaborators only; the engine ignores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0-100.
    #[serde(default = "default_volume")]
    pub volume: u32,
}

/// User settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub audio: AudioSettings,
}

fn default_total_rounds() -> u32 {
    TimerConfig::default().total_rounds
}
fn default_work_duration() -> u32 {
    TimerConfig::default().work_duration
}
fn default_rest_duration() -> u32 {
    TimerConfig::default().rest_duration
}
fn default_prep_duration() -> u32 {
    TimerConfig::default().prep_duration
}
fn default_warning_threshold() -> u32 {
    TimerConfig::default().warning_threshold
}
fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}
fn default_true() -> bool {
    true
}
fn default_volume() -> u32 {
    80
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from(TimerConfig::default())
    }
}

impl From<TimerConfig> for TimerSettings {
    fn from(config: TimerConfig) -> Self {
        Self {
            preset: String::new(),
            total_rounds: config.total_rounds,
            work_duration: config.work_duration,
            rest_duration: config.rest_duration,
            prep_duration: config.prep_duration,
            enable_warning: config.enable_warning,
            warning_threshold: config.warning_threshold,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
        }
    }
}

impl Settings {
    fn get_json_value_by_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut Value, key: &str, value: &str) -> Result<(), SettingsError> {
        let unknown = || SettingsError::UnknownKey(key.to_string());
        let invalid = |message: String| SettingsError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                Value::Bool(_) => Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("expected true or false, got '{value}'")))?,
                ),
                Value::Number(_) => Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("expected a whole number, got '{value}'")))?
                        .into(),
                ),
                Value::Object(_) | Value::Array(_) => return Err(unknown()),
                _ => Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Load from the default location, or defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&settings_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let load_failed = |message: String| SettingsError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| load_failed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = settings_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let save_failed = |message: String| SettingsError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a value as string by dot-separated key (`timer.work_duration`).
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf as `(dot.path, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            collect_leaves(&json, String::new(), &mut out);
        }
        out
    }

    /// Set a value by dot-separated key. The value is type-checked against the
    /// existing field and the section it belongs to must still be valid;
    /// `self` is unchanged on error. Does not save.
    ///
    /// # Errors
    ///
    /// `UnknownKey` for keys that do not name a field, `InvalidValue` for
    /// values of the wrong type or out of range. An out-of-range error names
    /// the field that failed, which may be a sibling of `key`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let candidate: Settings =
            serde_json::from_value(json).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        let section = key.split('.').next().unwrap_or_default();
        candidate
            .validate_section(section)
            .map_err(|e| SettingsError::InvalidValue {
                key: failing_key(section, &e).unwrap_or_else(|| key.to_string()),
                message: e.to_string(),
            })?;
        *self = candidate;
        Ok(())
    }

    /// Check every section the core consumes.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        SECTIONS
            .iter()
            .try_for_each(|section| self.validate_section(section))
    }

    fn validate_section(&self, section: &str) -> Result<(), ConfigurationError> {
        match section {
            "timer" => self.timer_config().map(drop),
            "engine" => self.engine_options().map(drop),
            "audio" if self.audio.volume > MAX_VOLUME => Err(ConfigurationError::OutOfRange {
                field: "volume",
                value: u64::from(self.audio.volume),
                min: 0,
                max: u64::from(MAX_VOLUME),
            }),
            _ => Ok(()),
        }
    }

    /// Workout configuration this file describes, validated.
    ///
    /// # Errors
    ///
    /// `UnknownPreset` or the first out-of-range field.
    pub fn timer_config(&self) -> Result<TimerConfig, ConfigurationError> {
        let timer = &self.timer;
        let config = if timer.preset.trim().is_empty() {
            TimerConfig {
                total_rounds: timer.total_rounds,
                work_duration: timer.work_duration,
                rest_duration: timer.rest_duration,
                prep_duration: timer.prep_duration,
                enable_warning: timer.enable_warning,
                warning_threshold: timer.warning_threshold,
            }
        } else {
            timer.preset.parse::<Preset>()?.config()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn engine_options(&self) -> Result<EngineOptions, ConfigurationError> {
        EngineOptions::with_tick_interval_ms(self.engine.tick_interval_ms)
    }
}

/// Dot path of the file field behind a validation error in `section`.
fn failing_key(section: &str, error: &ConfigurationError) -> Option<String> {
    let field = match error {
        ConfigurationError::OutOfRange { field, .. } => snake_case(field),
        ConfigurationError::UnknownPreset(_) => "preset".to_string(),
        ConfigurationError::InvalidTickInterval { .. } => "tick_interval_ms".to_string(),
        ConfigurationError::SessionActive => return None,
    };
    Some(format!("{section}.{field}"))
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn collect_leaves(value: &Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, path, out);
            }
        }
        Value::String(s) => out.push((prefix, s.clone())),
        other => out.push((prefix, other.to_string())),
    }
}
