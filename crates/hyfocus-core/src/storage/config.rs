//! TOML-based configuration.
//!
//! Stores:
//! - Session durations
//! - Enforcement policy and exception classes
//! - Spawn blocking and the app whitelist
//! - Exit challenge settings
//! - Shake feedback parameters
//!
//! Configuration is stored at `~/.config/hyfocus/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::access::{EnforcementPolicy, MatchMode};
use crate::challenge::{ChallengeType, DEFAULT_PHRASE};
use crate::error::ConfigError;
use crate::shake::ShakeSettings;
use crate::timer::IntervalPlan;

/// Session durations in minutes. Out-of-range values are clamped when the
/// timer is configured, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_total_minutes")]
    pub total_minutes: i64,
    #[serde(default = "default_work_minutes")]
    pub work_minutes: i64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    #[serde(default)]
    pub enforce_during_break: bool,
    #[serde(default = "default_true")]
    pub floating_exempt: bool,
    /// Window classes never subject to enforcement.
    #[serde(default)]
    pub exception_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    #[serde(default = "default_true")]
    pub block_spawn: bool,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default)]
    pub kind: ChallengeType,
    #[serde(default = "default_phrase")]
    pub phrase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShakeConfig {
    #[serde(default = "default_intensity")]
    pub intensity_px: i64,
    #[serde(default = "default_shake_duration")]
    pub duration_ms: i64,
    #[serde(default = "default_shake_period")]
    pub period_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Mirror session status to the runtime state file for bar widgets.
    #[serde(default = "default_true")]
    pub state_file: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/hyfocus/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub shake: ShakeConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_total_minutes() -> i64 {
    120
}
fn default_work_minutes() -> i64 {
    25
}
fn default_break_minutes() -> i64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_phrase() -> String {
    DEFAULT_PHRASE.into()
}
fn default_intensity() -> i64 {
    15
}
fn default_shake_duration() -> i64 {
    300
}
fn default_shake_period() -> i64 {
    50
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            total_minutes: default_total_minutes(),
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            enforce_during_break: false,
            floating_exempt: true,
            exception_classes: Vec::new(),
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            block_spawn: true,
            whitelist: Vec::new(),
            match_mode: MatchMode::default(),
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            kind: ChallengeType::None,
            phrase: default_phrase(),
        }
    }
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            intensity_px: default_intensity(),
            duration_ms: default_shake_duration(),
            period_ms: default_shake_period(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { state_file: true }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
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
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .trim()
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let value = value.trim();
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as integer")));
                    }
                }
                serde_json::Value::Array(_) => parse_list(value).map_err(invalid)?,
                serde_json::Value::Object(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if there is no file yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get a config value as string by dot-separated key.
    ///
    /// Lists come back as JSON arrays.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// List values accept a JSON array or a comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a value by key and save to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    // ── Typed views for the core ─────────────────────────────────────

    pub fn plan(&self) -> IntervalPlan {
        IntervalPlan::new(
            self.timer.total_minutes,
            self.timer.work_minutes,
            self.timer.break_minutes,
        )
    }

    pub fn policy(&self) -> EnforcementPolicy {
        EnforcementPolicy {
            enforce_during_break: self.enforcement.enforce_during_break,
            floating_exempt: self.enforcement.floating_exempt,
        }
    }

    pub fn shake_settings(&self) -> ShakeSettings {
        ShakeSettings::new(
            self.shake.intensity_px,
            self.shake.duration_ms,
            self.shake.period_ms,
        )
    }
}

/// `["a","b"]` or `a, b`. Blank items are dropped.
fn parse_list(value: &str) -> Result<serde_json::Value, String> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| e.to_string());
    }
    Ok(serde_json::Value::Array(
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| serde_json::Value::String(item.to_string()))
            .collect(),
    ))
}
