mod config;
mod state_file;

pub use config::{
    ChallengeConfig, Config, EnforcementConfig, NotificationsConfig, ShakeConfig, SpawnConfig,
    TimerConfig,
};
pub use state_file::StateFile;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/hyfocus[-dev]/` based on HYFOCUS_ENV.
///
/// Set HYFOCUS_ENV=dev to use a development config directory.
///
/// # Errors
/// Returns an error if there is no home directory or creating the config
/// directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(".config");

    let env = std::env::var("HYFOCUS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("hyfocus-dev")
    } else {
        base_dir.join("hyfocus")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Directory for per-login runtime files: `$XDG_RUNTIME_DIR`, else the
/// system temp dir.
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}
