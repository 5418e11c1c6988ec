mod settings;

pub use settings::{AudioSettings, EngineSettings, Settings, TimerSettings};

use std::path::PathBuf;

/// Returns `<config dir>/roundbell/`, or `$ROUNDBELL_CONFIG_DIR` when set.
///
/// The directory is not created here; saving creates it.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("ROUNDBELL_CONFIG_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roundbell")
}

/// Default settings file location.
pub fn settings_path() -> PathBuf {
    config_dir().join("config.toml")
}
