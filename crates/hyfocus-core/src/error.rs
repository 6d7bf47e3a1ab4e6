//! Core error types for hyfocus-core.
//!
//! The session components themselves never fail: they clamp, coalesce or
//! report through boolean returns. Errors only appear at the boundary, when
//! configuration is read from disk or when a collaborator hands us command
//! arguments that still need parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for hyfocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No home directory could be resolved
    #[error("Cannot determine configuration directory")]
    NoConfigDir,
}

/// Validation errors for collaborator-supplied arguments.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Workspace id is not an integer or is below 1
    #[error("Invalid workspace ID '{0}': must be an integer >= 1")]
    InvalidWorkspaceId(String),

    /// Empty name (window class, application)
    #[error("Empty {0} name")]
    EmptyName(&'static str),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
