//! Driver selection: which driver serves a repository URL.

use crate::driver::{RepositoryData, VcsDriver};
use crate::github::GithubDriver;
use crate::remote::RemoteFilesystem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tug_config::Config;
use tug_core::{BoxFuture, ComposerManifest, Dist, Error, Result, Source};

/// Known driver kinds, in probing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// GitHub and GitHub Enterprise.
    Github,
}

impl DriverKind {
    /// Every kind, highest priority first.
    pub const ALL: &'static [Self] = &[Self::Github];

    /// Driver name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
        }
    }

    /// Whether a driver of this kind can serve `url`.
    #[must_use]
    pub fn supports(self, config: &Config, url: &str) -> bool {
        match self {
            Self::Github => GithubDriver::supports(config, url),
        }
    }

    /// First kind supporting `url`.
    #[must_use]
    pub fn detect(config: &Config, url: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.supports(config, url))
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete driver.
#[derive(Debug)]
pub enum Driver {
    /// GitHub driver.
    Github(GithubDriver),
}

impl Driver {
    /// Build the driver serving `url`.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedRepository`] when no kind supports `url`.
    pub fn for_url(url: &str, config: &Config, rfs: Arc<dyn RemoteFilesystem>) -> Result<Self> {
        match DriverKind::detect(config, url) {
            Some(DriverKind::Github) => Ok(Self::Github(GithubDriver::new(url, config, rfs)?)),
            None => Err(Error::UnsupportedRepository {
                url: url.to_string(),
            }),
        }
    }

    fn inner(&self) -> &dyn VcsDriver {
        match self {
            Self::Github(driver) => driver,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn VcsDriver {
        match self {
            Self::Github(driver) => driver,
        }
    }
}

impl VcsDriver for Driver {
    fn kind(&self) -> DriverKind {
        self.inner().kind()
    }

    fn url(&self) -> &str {
        self.inner().url()
    }

    fn repo_data(&mut self) -> BoxFuture<'_, Result<RepositoryData>> {
        self.inner_mut().repo_data()
    }

    fn root_identifier(&mut self) -> BoxFuture<'_, Result<String>> {
        self.inner_mut().root_identifier()
    }

    fn source(&self, identifier: &str) -> Source {
        self.inner().source(identifier)
    }

    fn dist(&self, identifier: &str) -> Dist {
        self.inner().dist(identifier)
    }

    fn composer_information<'a>(
        &'a mut self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<Arc<ComposerManifest>>>> {
        self.inner_mut().composer_information(identifier)
    }

    fn file_content<'a>(
        &'a self,
        file: &'a str,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        self.inner().file_content(file, identifier)
    }

    fn change_date<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<DateTime<Utc>>>> {
        self.inner().change_date(identifier)
    }

    fn tags(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        self.inner_mut().tags()
    }

    fn branches(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        self.inner_mut().branches()
    }

    fn invalidate(&mut self) {
        self.inner_mut().invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::StaticRemoteFilesystem;

    #[test]
    fn detects_github() {
        let config = Config::default();
        assert_eq!(
            DriverKind::detect(&config, "git@github.com:acme/foo.git"),
            Some(DriverKind::Github)
        );
        assert_eq!(DriverKind::detect(&config, "https://bitbucket.org/acme/foo"), None);
        assert_eq!(DriverKind::Github.to_string(), "github");
    }

    #[test]
    fn for_url_builds_driver() {
        let rfs: Arc<dyn RemoteFilesystem> = Arc::new(StaticRemoteFilesystem::new());
        let driver = Driver::for_url("https://github.com/acme/foo", &Config::default(), rfs.clone())
            .unwrap();
        assert_eq!(driver.kind(), DriverKind::Github);
        assert_eq!(driver.url(), "https://github.com/acme/foo.git");

        let err = Driver::for_url("https://example.com/acme/foo", &Config::default(), rfs)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRepository { .. }));
    }
}
