//! Credentials for VCS hosts, in Composer's `auth.json` layout.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AuthConfig {
    /// GitHub OAuth tokens by domain.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub github_oauth: BTreeMap<String, String>,
}

impl AuthConfig {
    /// Parse inline auth JSON, as given by `COMPOSER_AUTH`.
    ///
    /// # Errors
    /// Returns error if the content is not valid auth JSON.
    pub fn parse_inline(var: &str, content: &str) -> Result<Self> {
        sonic_rs::from_str(content).map_err(|e| ConfigError::Env {
            var: var.to_string(),
            message: e.to_string(),
        })
    }

    /// Merge another auth config into this one; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Self) {
        for (k, v) in &other.github_oauth {
            self.github_oauth.insert(normalize_domain(k), v.clone());
        }
    }

    /// Get GitHub OAuth token for a domain.
    #[must_use]
    pub fn get_github_oauth(&self, domain: &str) -> Option<&str> {
        self.github_oauth
            .get(domain)
            .or_else(|| self.github_oauth.get(&normalize_domain(domain)))
            .map(String::as_str)
    }
}

/// Lowercase a host and drop a leading `www.`.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    domain
        .strip_prefix("www.")
        .map_or_else(|| domain.clone(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lookup_ignores_www() {
        let mut auth = AuthConfig::default();
        auth.github_oauth
            .insert("github.com".to_string(), "secret".to_string());

        assert_eq!(auth.get_github_oauth("github.com"), Some("secret"));
        assert_eq!(auth.get_github_oauth("www.github.com"), Some("secret"));
        assert_eq!(auth.get_github_oauth("git.example.com"), None);
    }

    #[test]
    fn merge_overrides() {
        let mut base = AuthConfig::parse_inline(
            "COMPOSER_AUTH",
            r#"{"github-oauth":{"github.com":"old"}}"#,
        )
        .unwrap();
        let other = AuthConfig::parse_inline(
            "COMPOSER_AUTH",
            r#"{"github-oauth":{"WWW.github.com":"new","ghe.acme.io":"ent"}}"#,
        )
        .unwrap();
        base.merge(&other);

        assert_eq!(base.get_github_oauth("github.com"), Some("new"));
        assert_eq!(base.get_github_oauth("ghe.acme.io"), Some("ent"));
    }

    #[test]
    fn inline_parse_error_names_variable() {
        let err = AuthConfig::parse_inline("COMPOSER_AUTH", "{").unwrap_err();
        assert!(err.to_string().contains("COMPOSER_AUTH"));
    }
}
