use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config::TimerConfig;
use crate::error::ConfigurationError;

/// Named workout configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Beginner,
    Intermediate,
    Advanced,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Beginner, Preset::Intermediate, Preset::Advanced];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Beginner => "beginner",
            Preset::Intermediate => "intermediate",
            Preset::Advanced => "advanced",
        }
    }

    pub fn config(&self) -> TimerConfig {
        let (total_rounds, work_duration, rest_duration) = match self {
            Preset::Beginner => (3, 120, 60),
            Preset::Intermediate => (6, 180, 60),
            Preset::Advanced => (12, 180, 60),
        };
        TimerConfig {
            total_rounds,
            work_duration,
            rest_duration,
            prep_duration: 10,
            enable_warning: true,
            warning_threshold: 10,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigurationError::UnknownPreset(s.to_string()))
    }
}
