//! Job envelopes.

use serde::{Deserialize, Serialize};
use tug_core::{Result, json};

/// A queued job.
///
/// Delivery is at-least-once, so executing a message twice must leave the
/// store as executing it once would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Refresh every branch and tag of a repository.
    #[serde(rename_all = "camelCase")]
    RefreshPackages {
        /// Repository URL.
        repository_url: String,
        /// Rewrite versions even when their reference did not move.
        #[serde(default)]
        force: bool,
    },

    /// Refresh one version of a repository.
    #[serde(rename_all = "camelCase")]
    RefreshPackage {
        /// Repository URL.
        repository_url: String,
        /// Commit the version points at.
        identifier: String,
        /// Tag name or `dev-` branch name.
        version: String,
        /// Rewrite the version even when its reference did not move.
        #[serde(default)]
        force: bool,
    },
}

impl Message {
    /// Discriminator, as serialized in `type`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RefreshPackages { .. } => "refresh-packages",
            Self::RefreshPackage { .. } => "refresh-package",
        }
    }

    /// Repository the job is about.
    #[must_use]
    pub fn repository_url(&self) -> &str {
        match self {
            Self::RefreshPackages { repository_url, .. }
            | Self::RefreshPackage { repository_url, .. } => repository_url,
        }
    }

    /// Whether the job bypasses "already up to date" checks.
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        match self {
            Self::RefreshPackages { force, .. } | Self::RefreshPackage { force, .. } => *force,
        }
    }

    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        json::encode(self)
    }

    /// Parse the JSON wire form.
    ///
    /// # Errors
    /// Returns [`tug_core::Error::InvalidJson`] for unknown or malformed payloads.
    pub fn from_json(payload: &str) -> Result<Self> {
        json::decode("message", payload)
    }
}
