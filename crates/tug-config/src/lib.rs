//! Configuration management for Tug.
//!
//! Configuration is a single JSON document merged, in priority order, from:
//!
//! 1. Built-in defaults
//! 2. A config file (`tug.json`, kebab-case keys)
//! 3. Environment variables:
//!    - `COMPOSER_AUTH` - inline `auth.json` content
//!    - `TUG_GITHUB_TOKEN` - OAuth token for `github.com`
//!    - `TUG_GITHUB_API_URL` - API base override for every GitHub host
//!
//! ```json
//! {
//!     "github-domains": ["github.com", "ghe.acme.io"],
//!     "github-oauth": { "github.com": "your-token" },
//!     "http": { "timeout-secs": 30, "retries": 3 },
//!     "queue": { "delay-secs": 0 }
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod error;

pub use auth::{AuthConfig, normalize_domain};
pub use error::{ConfigError, Result};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding inline auth JSON.
pub const ENV_AUTH: &str = "COMPOSER_AUTH";

/// Environment variable holding the `github.com` token.
pub const ENV_GITHUB_TOKEN: &str = "TUG_GITHUB_TOKEN";

/// Environment variable overriding the GitHub API base URL.
pub const ENV_GITHUB_API_URL: &str = "TUG_GITHUB_API_URL";

/// Tug configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Hosts served by the GitHub driver.
    pub github_domains: Vec<String>,
    /// API base URL used instead of the host-derived one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_api_url: Option<String>,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Queue settings.
    pub queue: QueueConfig,
    /// Metadata store settings.
    pub database: DatabaseConfig,
    /// Credentials.
    #[serde(flatten)]
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_domains: vec!["github.com".to_string()],
            github_api_url: None,
            http: HttpConfig::default(),
            queue: QueueConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HttpConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Total request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transport failures and 5xx responses.
    pub retries: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("tug/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            retries: 3,
        }
    }
}

impl HttpConfig {
    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Queue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct QueueConfig {
    /// Delay before a batch is delivered, in seconds.
    pub delay_secs: u64,
}

impl QueueConfig {
    /// Delivery delay, `None` for immediate delivery.
    #[must_use]
    pub const fn delay(&self) -> Option<Duration> {
        if self.delay_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.delay_secs))
        }
    }
}

/// Metadata store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    /// Snapshot file, `None` keeps everything in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Id namespace of package versions.
    pub package_prefix: String,
    /// Id namespace of repositories.
    pub repository_prefix: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            package_prefix: "package".to_string(),
            repository_prefix: "repository".to_string(),
        }
    }
}

impl Config {
    /// Load config from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Self = sonic_rs::from_str(&content).map_err(|e| ConfigError::json(path, &e))?;
        debug!(path = %path.display(), "loaded config");
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path` if given, defaults otherwise, then apply the
    /// process environment.
    ///
    /// # Errors
    /// Returns error if the file or an environment variable is invalid.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns error if an override cannot be parsed.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(inline) = lookup(ENV_AUTH).filter(|v| !v.trim().is_empty()) {
            let auth = AuthConfig::parse_inline(ENV_AUTH, &inline)?;
            self.auth.merge(&auth);
        }

        if let Some(token) = lookup(ENV_GITHUB_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.auth
                .github_oauth
                .insert("github.com".to_string(), token.trim().to_string());
        }

        if let Some(api_url) = lookup(ENV_GITHUB_API_URL).filter(|v| !v.trim().is_empty()) {
            self.github_api_url = Some(api_url.trim().trim_end_matches('/').to_string());
        }

        self.validate()?;
        Ok(self)
    }

    /// Check semantic constraints.
    ///
    /// # Errors
    /// Returns error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout-secs must be greater than zero".into(),
            ));
        }
        if self.database.package_prefix.contains(':')
            || self.database.repository_prefix.contains(':')
        {
            return Err(ConfigError::Invalid(
                "database prefixes must not contain ':'".into(),
            ));
        }
        if let Some(url) = &self.github_api_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "github-api-url \"{url}\" must be an http(s) URL"
            )));
        }
        Ok(())
    }

    /// Whether `host` is served by the GitHub driver.
    #[must_use]
    pub fn is_github_domain(&self, host: &str) -> bool {
        let host = normalize_domain(host);
        self.github_domains
            .iter()
            .any(|domain| normalize_domain(domain) == host)
            || self.auth.get_github_oauth(&host).is_some()
    }

    /// OAuth token for a GitHub host.
    #[must_use]
    pub fn github_token(&self, host: &str) -> Option<&str> {
        self.auth.get_github_oauth(host)
    }
}
