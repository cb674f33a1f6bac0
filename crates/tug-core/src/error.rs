//! Error types for Tug operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Tug.
#[derive(Error, Debug)]
pub enum Error {
    /// Version string cannot be normalized.
    #[error("invalid version string \"{version}\" (from \"{full_version}\")")]
    InvalidVersion {
        /// Version after alias stripping.
        version: String,
        /// Version as originally given.
        full_version: String,
    },

    /// Repository URL is malformed for the driver.
    #[error("the {driver} repository URL \"{url}\" is invalid")]
    InvalidUrl {
        /// Driver name.
        driver: String,
        /// Rejected URL.
        url: String,
    },

    /// No driver claims the repository URL.
    #[error("no VCS driver supports the repository \"{url}\"")]
    UnsupportedRepository {
        /// Repository URL.
        url: String,
    },

    /// File is missing or unreadable at the reference.
    #[error("file \"{file}\" not found for reference \"{reference}\"")]
    ContentNotFound {
        /// File path inside the repository.
        file: String,
        /// Branch, tag or commit.
        reference: String,
    },

    /// Upstream request failed.
    #[error("transport error for {url}: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Upstream API rate limit exhausted.
    #[error("rate limited by {url}")]
    RateLimited {
        /// Requested URL.
        url: String,
        /// Unix timestamp at which the quota resets.
        reset_at: Option<i64>,
    },

    /// Upstream API answered with a body that is not valid JSON.
    #[error("invalid JSON returned by {url}: {message}")]
    InvalidJson {
        /// Requested URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// Repository is not enabled.
    #[error("repository \"{url}\" is not enabled")]
    RepositoryNotFound {
        /// Repository URL or package name.
        url: String,
    },

    /// Version has no matching tag or branch.
    #[error("no tag or branch matches version \"{version}\" in \"{url}\"")]
    ReferenceNotFound {
        /// Repository URL.
        url: String,
        /// Requested version.
        version: String,
    },

    /// Composer manifest is unusable.
    #[error("invalid composer manifest: {0}")]
    InvalidManifest(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// Persistence error.
    #[error("database error: {0}")]
    Database(String),

    /// Queue error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a transport error from an HTTP status.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::Transport {
            url: url.into(),
            status: Some(status),
            message: format!("HTTP {status}"),
        }
    }

    /// Expected absence: an upstream 404 or a missing file.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContentNotFound { .. }
                | Self::Transport {
                    status: Some(404),
                    ..
                }
        )
    }

    /// Failures worth redelivering later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => match status {
                Some(code) => *code >= 500 || *code == 408,
                None => true,
            },
            Self::RateLimited { .. } | Self::Database(_) | Self::Queue(_) => true,
            _ => false,
        }
    }
}

/// Result type for Tug operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(Error::http_status("https://api.github.com/x", 404).is_not_found());
        assert!(
            Error::ContentNotFound {
                file: "composer.json".into(),
                reference: "main".into(),
            }
            .is_not_found()
        );
        assert!(!Error::http_status("https://api.github.com/x", 500).is_not_found());
    }

    #[test]
    fn retryable_classification() {
        assert!(Error::http_status("u", 502).is_retryable());
        assert!(!Error::http_status("u", 404).is_retryable());
        assert!(
            !Error::InvalidVersion {
                version: "x".into(),
                full_version: "x".into(),
            }
            .is_retryable()
        );
        assert!(
            Error::RateLimited {
                url: "u".into(),
                reset_at: None,
            }
            .is_retryable()
        );
    }
}
