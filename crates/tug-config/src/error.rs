//! Configuration errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File cannot be read.
    #[error("cannot read {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// File is not valid JSON.
    #[error("invalid JSON in {path}: {message}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Environment variable holds an unusable value.
    #[error("invalid value for {var}: {message}")]
    Env {
        /// Variable name.
        var: String,
        /// Error message.
        message: String,
    },

    /// Semantically invalid configuration.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Create a JSON error with context.
    #[must_use]
    pub fn json(path: &Path, err: &sonic_rs::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for tug_core::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
