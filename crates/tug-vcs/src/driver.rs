//! The VCS driver abstraction.

use crate::registry::DriverKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tug_core::{BoxFuture, ComposerManifest, Dist, Result, Source};

/// Repository metadata as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryData {
    /// Owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Default branch.
    pub default_branch: String,
    /// Whether the repository is private.
    pub private: bool,
    /// Whether the issue tracker is enabled.
    pub has_issues: bool,
}

/// Read access to one hosted repository.
///
/// Methods taking `&mut self` memoize their answers in the driver cache until
/// [`VcsDriver::invalidate`] is called.
pub trait VcsDriver: Send + Sync + std::fmt::Debug {
    /// Driver kind.
    fn kind(&self) -> DriverKind;

    /// Canonical repository URL.
    fn url(&self) -> &str;

    /// Repository metadata.
    fn repo_data(&mut self) -> BoxFuture<'_, Result<RepositoryData>>;

    /// Default branch.
    fn root_identifier(&mut self) -> BoxFuture<'_, Result<String>>;

    /// Clone descriptor of `identifier`.
    fn source(&self, identifier: &str) -> Source;

    /// Archive descriptor of `identifier`.
    fn dist(&self, identifier: &str) -> Dist;

    /// Composer manifest at `identifier`, `None` when the reference has none.
    fn composer_information<'a>(
        &'a mut self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<Arc<ComposerManifest>>>>;

    /// Decoded content of `file` at `identifier`, `None` when absent.
    fn file_content<'a>(
        &'a self,
        file: &'a str,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>>>;

    /// Commit date of `identifier`.
    fn change_date<'a>(&'a self, identifier: &'a str)
    -> BoxFuture<'a, Result<Option<DateTime<Utc>>>>;

    /// Tag name to commit.
    fn tags(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>>;

    /// Branch name to commit.
    fn branches(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>>;

    /// Forget every cached answer.
    fn invalidate(&mut self);
}
