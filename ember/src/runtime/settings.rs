use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::framework::logging::DEFAULT_FILTER;

pub const SETTINGS_VERSION: &str = "1";
pub const SETTINGS_ENV_VAR: &str = "EMBER_SETTINGS";

const DEFAULT_REFRESH_RATE: f32 = 60.0;
const DEFAULT_PLATFORM_EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub version: String,
    /// Execution context threads are named `<thread_prefix>.<context>`.
    pub thread_prefix: String,
    /// Rate in Hz used when no display signal is available.
    pub refresh_rate: f32,
    pub platform_event_capacity: usize,
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION.to_string(),
            thread_prefix: "ember".to_string(),
            refresh_rate: DEFAULT_REFRESH_RATE,
            platform_event_capacity: DEFAULT_PLATFORM_EVENT_CAPACITY,
            log_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl EngineSettings {
    pub fn refresh_rate(&self) -> f32 {
        self.refresh_rate.max(1.0)
    }

    pub fn platform_event_capacity(&self) -> usize {
        self.platform_event_capacity.max(1)
    }
}

pub fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join("Ember"))
}

/// `$EMBER_SETTINGS` when set, otherwise `settings.json` in the user config
/// directory.
pub fn settings_path() -> Option<PathBuf> {
    match env::var_os(SETTINGS_ENV_VAR) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => config_dir().map(|dir| dir.join("settings.json")),
    }
}

pub fn load_settings(path: &Path) -> Result<EngineSettings, SettingsError> {
    let source = fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => Ok(serde_json::from_str(&source)?),
        "yaml" | "yml" => Ok(serde_yml::from_str(&source)?),
        other => Err(SettingsError::UnsupportedFormat(other.to_string())),
    }
}

pub fn load_settings_if_exists(
    path: &Path,
) -> Result<Option<EngineSettings>, SettingsError> {
    match load_settings(path) {
        Ok(settings) => Ok(Some(settings)),
        Err(SettingsError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Resolves [`settings_path`] and falls back to defaults when nothing is
/// stored there yet.
pub fn load_or_default() -> Result<EngineSettings, SettingsError> {
    let Some(path) = settings_path() else {
        return Ok(EngineSettings::default());
    };

    Ok(load_settings_if_exists(&path)?.unwrap_or_default())
}

pub fn save_settings(
    path: &Path,
    settings: &EngineSettings,
) -> Result<(), SettingsError> {
    let json = serde_json::to_string_pretty(settings)?;
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    fs::write(path, json)?;
    Ok(())
}
