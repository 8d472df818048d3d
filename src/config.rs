use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::timer::SessionDurations;

const DEFAULTS_TOML: &str = include_str!("dashboard.toml");

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DashboardConfig {
    pub storage_key: String,
    pub default_user: String,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub retention_days: i64,
}

/// Overrides read from a user file; absent keys keep the built-in value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfigFile {
    #[serde(default)]
    storage_key: Option<String>,
    #[serde(default)]
    default_user: Option<String>,
    #[serde(default)]
    focus_minutes: Option<u32>,
    #[serde(default)]
    break_minutes: Option<u32>,
    #[serde(default)]
    retention_days: Option<i64>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "could not read config: {}", err),
            ConfigError::Toml(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Invalid(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Toml(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

impl DashboardConfig {
    pub fn builtin() -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(DEFAULTS_TOML)?;
        config.validated()
    }

    /// Built-in defaults, overlaid with `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = Self::builtin()?;
        match path {
            Some(path) => base.overlay(&std::fs::read_to_string(path)?),
            None => Ok(base),
        }
    }

    pub(crate) fn overlay(self, raw: &str) -> Result<Self, ConfigError> {
        let file: RawConfigFile = toml::from_str(raw)?;
        Self {
            storage_key: file.storage_key.unwrap_or(self.storage_key),
            default_user: file.default_user.unwrap_or(self.default_user),
            focus_minutes: file.focus_minutes.unwrap_or(self.focus_minutes),
            break_minutes: file.break_minutes.unwrap_or(self.break_minutes),
            retention_days: file.retention_days.unwrap_or(self.retention_days),
        }
        .validated()
    }

    pub fn session_durations(&self) -> SessionDurations {
        SessionDurations::from_minutes(self.focus_minutes, self.break_minutes)
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.storage_key = self.storage_key.trim().to_string();
        self.default_user = self.default_user.trim().to_string();
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid(
                "storage_key cannot be empty".to_string(),
            ));
        }
        if self.default_user.is_empty() {
            return Err(ConfigError::Invalid(
                "default_user cannot be empty".to_string(),
            ));
        }
        if self.focus_minutes == 0 || self.break_minutes == 0 {
            return Err(ConfigError::Invalid(
                "session lengths must be at least one minute".to_string(),
            ));
        }
        if self.retention_days < 30 {
            return Err(ConfigError::Invalid(
                "retention_days must cover the 30-day month window".to_string(),
            ));
        }
        Ok(self)
    }
}
