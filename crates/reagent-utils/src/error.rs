//! Settings errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON for the settings schema
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A `${VAR}` or `$VAR` reference names an unset variable
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Invalid expansion pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Settings parsed but are inconsistent
    #[error("Invalid settings: {0}")]
    Invalid(String),
}
