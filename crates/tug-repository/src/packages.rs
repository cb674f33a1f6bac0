//! Package versions mirrored from enabled repositories.

use crate::manager::{RepositoryHandle, RepositoryManager};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tug_core::{Error, PackageName, PackageVersion, Result, json, version};
use tug_db::{Page, PackageRepository, RepositoryRecord, WriteOutcome};
use tug_queue::{Message, MessageQueue};
use tug_vcs::VcsDriver;

/// Result of refreshing one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new version was stored.
    Created,
    /// An existing version changed.
    Updated,
    /// Nothing to write.
    Unchanged,
    /// The reference has no usable manifest or version.
    Skipped,
}

impl From<WriteOutcome> for RefreshOutcome {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Created => Self::Created,
            WriteOutcome::Updated => Self::Updated,
            WriteOutcome::Unchanged => Self::Unchanged,
        }
    }
}

/// A refreshed version and the repository it came from.
#[derive(Debug, Clone)]
pub struct PackageRefresh {
    /// Repository state after the refresh.
    pub record: RepositoryRecord,
    /// What happened to the version.
    pub outcome: RefreshOutcome,
}

/// Versions removed by a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDeletion {
    /// Package the versions belonged to, when it could be resolved.
    pub package_name: Option<PackageName>,
    /// Number of versions removed.
    pub removed: usize,
}

/// Refreshes, enqueues and deletes package versions.
#[derive(Debug)]
pub struct PackageManager {
    repositories: Arc<RepositoryManager>,
    packages: PackageRepository,
    queue: Arc<dyn MessageQueue>,
    delay: Option<Duration>,
}

impl PackageManager {
    /// Create a manager; `delay` applies to every queued batch.
    #[must_use]
    pub fn new(
        repositories: Arc<RepositoryManager>,
        packages: PackageRepository,
        queue: Arc<dyn MessageQueue>,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            repositories,
            packages,
            queue,
            delay,
        }
    }

    /// Repository manager.
    #[must_use]
    pub const fn repositories(&self) -> &Arc<RepositoryManager> {
        &self.repositories
    }

    async fn require(&self, url: &str, force: bool) -> Result<RepositoryHandle> {
        self.repositories
            .get_and_init_repository(url, force)
            .await?
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.to_string(),
            })
    }

    /// Refresh one version now.
    ///
    /// `version` is a tag name or a branch name prefixed with `dev-`.
    ///
    /// # Errors
    /// Returns [`Error::RepositoryNotFound`] when the repository is not
    /// enabled, [`Error::ReferenceNotFound`] when no tag or branch matches.
    pub async fn refresh_package(
        &self,
        url: &str,
        version: &str,
        force: bool,
    ) -> Result<PackageRefresh> {
        let handle = self.require(url, force).await?;
        let (canonical, identifier) = {
            let mut repository = handle.lock().await;
            let canonical = repository.url().to_string();
            let driver = repository.driver_mut();

            let mut identifier = driver.tags().await?.get(version).cloned();
            if identifier.is_none()
                && let Some(branch) = version.strip_prefix("dev-")
            {
                identifier = driver.branches().await?.get(branch).cloned();
            }

            let identifier = identifier.ok_or_else(|| Error::ReferenceNotFound {
                url: canonical.clone(),
                version: version.to_string(),
            })?;
            (canonical, identifier)
        };

        let outcome = self
            .refresh_version(&canonical, &identifier, version, force)
            .await?;
        let record = handle.lock().await.record().clone();
        Ok(PackageRefresh { record, outcome })
    }

    /// Store the version `version` built from the commit `identifier`.
    ///
    /// # Errors
    /// Returns error if the repository is not enabled, the upstream fails or
    /// neither the manifest nor the repository names the package.
    pub async fn refresh_version(
        &self,
        url: &str,
        identifier: &str,
        version: &str,
        force: bool,
    ) -> Result<RefreshOutcome> {
        let handle = self.require(url, false).await?;
        let mut repository = handle.lock().await;

        let manifest = match repository.driver_mut().composer_information(identifier).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                debug!(url, version, "no composer manifest, skipped");
                return Ok(RefreshOutcome::Skipped);
            }
            Err(Error::ContentNotFound { file, .. }) => {
                debug!(url, version, file = %file, "unreadable composer manifest, skipped");
                return Ok(RefreshOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        let name = manifest
            .package_name()
            .or_else(|| repository.package_name().cloned())
            .ok_or_else(|| {
                Error::InvalidManifest(format!("{url} at {version} declares no package name"))
            })?;

        let normalized = match version::normalize(version, None) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(url, version, error = %e, "unparsable version, skipped");
                return Ok(RefreshOutcome::Skipped);
            }
        };

        if !force
            && let Some(existing) = self.packages.find_version(&name, &normalized).await?
            && existing.reference == identifier
        {
            debug!(package = %name, version = %normalized, "reference unchanged");
            return Ok(RefreshOutcome::Unchanged);
        }

        let driver = repository.driver();
        let now = Utc::now();
        let package = PackageVersion {
            name,
            version: normalized,
            pretty_version: version.to_string(),
            reference: identifier.to_string(),
            composer: json::encode(&*manifest)?,
            source: driver.source(identifier),
            dist: driver.dist(identifier),
            created_at: now,
            updated_at: now,
        };
        drop(repository);

        let id = package.id();
        let outcome = RefreshOutcome::from(self.packages.upsert(package).await?);
        info!(id = %id, ?outcome, "refreshed version");
        Ok(outcome)
    }

    /// Queue one `refresh-package` job per branch and tag of `url`.
    ///
    /// Returns `Ok(None)` when the repository is not enabled, else the record
    /// and the number of jobs queued.
    ///
    /// # Errors
    /// Returns error if the upstream or the queue fails.
    pub async fn enqueue_versions(
        &self,
        url: &str,
        force: bool,
    ) -> Result<Option<(RepositoryRecord, usize)>> {
        let Some(handle) = self.repositories.get_and_init_repository(url, force).await? else {
            return Ok(None);
        };

        let (record, messages) = {
            let mut repository = handle.lock().await;
            let repository_url = repository.url().to_string();
            let driver = repository.driver_mut();
            let branches = driver.branches().await?;
            let tags = driver.tags().await?;

            let messages: Vec<Message> = branches
                .into_iter()
                .map(|(name, identifier)| (format!("dev-{name}"), identifier))
                .chain(tags)
                .map(|(version, identifier)| Message::RefreshPackage {
                    repository_url: repository_url.clone(),
                    identifier,
                    version,
                    force,
                })
                .collect();
            (repository.record().clone(), messages)
        };

        let count = messages.len();
        self.queue.send_batch(messages, self.delay).await?;
        info!(url = %record.url, count, force, "queued version refreshes");
        Ok(Some((record, count)))
    }

    /// Queue a refresh of every version of `url`.
    ///
    /// # Errors
    /// Returns [`Error::RepositoryNotFound`] when the repository is not enabled.
    pub async fn refresh_packages(&self, url: &str, force: bool) -> Result<RepositoryRecord> {
        self.enqueue_versions(url, force)
            .await?
            .map(|(record, _)| record)
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.to_string(),
            })
    }

    /// Queue a `refresh-packages` job for every enabled repository.
    ///
    /// One repository failing never prevents the others.
    ///
    /// # Errors
    /// Returns error only if the repositories cannot be listed.
    pub async fn refresh_all_packages(
        &self,
        force: bool,
    ) -> Result<BTreeMap<String, Result<RepositoryRecord>>> {
        let mut results = BTreeMap::new();

        for record in self.repositories.all_records().await? {
            let message = Message::RefreshPackages {
                repository_url: record.url.clone(),
                force,
            };
            let result = match self.queue.send(message, self.delay).await {
                Ok(()) => Ok(record.clone()),
                Err(e) => {
                    warn!(url = %record.url, error = %e, "failed to queue repository refresh");
                    Err(e)
                }
            };
            results.insert(record.url, result);
        }

        Ok(results)
    }

    /// Package published by `target`, a `vendor/name` or a repository URL.
    ///
    /// The stored package name wins; the repository is only initialized when
    /// none was recorded yet, and a failing initialization resolves to nothing.
    async fn resolve_package(&self, target: &str) -> Result<Option<PackageName>> {
        if let Some(name) = PackageName::parse(target) {
            return Ok(Some(name));
        }

        let Some(record) = self.repositories.repository(target).await? else {
            return Ok(None);
        };
        if record.package_name.is_some() {
            return Ok(record.package_name);
        }

        match self.repositories.get_and_init_repository(&record.url, false).await {
            Ok(Some(handle)) => Ok(handle.lock().await.package_name().cloned()),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(url = %record.url, error = %e, "cannot resolve package of repository");
                Ok(None)
            }
        }
    }

    /// Delete one version; `version` is normalized first.
    ///
    /// # Errors
    /// Returns error if `target` is unsupported or the store fails.
    pub async fn delete_package(&self, target: &str, version: &str) -> Result<PackageDeletion> {
        let Some(name) = self.resolve_package(target).await? else {
            debug!(target, "no package to delete");
            return Ok(PackageDeletion {
                package_name: None,
                removed: 0,
            });
        };

        let normalized = version::normalize(version, None)?;
        let removed = usize::from(self.packages.delete_version(&name, &normalized).await?);
        info!(package = %name, version = %normalized, removed, "deleted version");
        Ok(PackageDeletion {
            package_name: Some(name),
            removed,
        })
    }

    /// Delete every version of a package.
    ///
    /// # Errors
    /// Returns error if `target` is unsupported or the store fails.
    pub async fn delete_packages(&self, target: &str) -> Result<PackageDeletion> {
        let Some(name) = self.resolve_package(target).await? else {
            debug!(target, "no package to delete");
            return Ok(PackageDeletion {
                package_name: None,
                removed: 0,
            });
        };

        let removed = self.packages.delete_all(&name).await?;
        info!(package = %name, removed, "deleted versions");
        Ok(PackageDeletion {
            package_name: Some(name),
            removed,
        })
    }

    /// Drop the driver cache of `url`.
    ///
    /// # Errors
    /// Returns [`Error::RepositoryNotFound`] when the repository is not enabled.
    pub async fn refresh_cache_packages(&self, url: &str) -> Result<RepositoryRecord> {
        let record = self
            .repositories
            .repository(url)
            .await?
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.to_string(),
            })?;
        self.repositories.invalidate(&record.url).await?;
        Ok(record)
    }

    /// Drop every driver cache; returns how many were dropped.
    pub async fn refresh_all_cache_packages(&self) -> usize {
        self.repositories.invalidate_all().await
    }

    /// Stored versions of `name`, optionally narrowed to versions containing
    /// `search`.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn list_versions(
        &self,
        name: &PackageName,
        search: Option<&str>,
        start_id: Option<&str>,
        limit: usize,
    ) -> Result<Page<PackageVersion>> {
        self.packages.list(name, search, start_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{API, CANONICAL, Harness, URL, contents, manifest_url, set_tags};

    const NAME: &str = "acme/foo";

    fn name() -> PackageName {
        PackageName::parse(NAME).unwrap()
    }

    async fn versions(packages: &PackageManager) -> Vec<String> {
        packages
            .list_versions(&name(), None, None, 0)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|v| v.version)
            .collect()
    }

    #[tokio::test]
    async fn enqueue_builds_one_job_per_ref() {
        let harness = Harness::recording();
        harness.repositories.enable(URL).await.unwrap();

        let record = harness.packages.refresh_packages(URL, true).await.unwrap();
        assert_eq!(record.url, CANONICAL);
        assert_eq!(record.package_name, Some(name()));

        let batches = harness.queue.batches.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1, Some(Duration::from_secs(2)));

        let messages = harness.queue.messages();
        assert_eq!(messages.len(), 5);
        assert!(messages.iter().all(|m| m.is_forced() && m.repository_url() == CANONICAL));

        let mut refs: Vec<(String, String)> = messages
            .into_iter()
            .map(|m| match m {
                Message::RefreshPackage {
                    version, identifier, ..
                } => (version, identifier),
                Message::RefreshPackages { .. } => unreachable!(),
            })
            .collect();
        refs.sort();
        assert_eq!(
            refs,
            [
                ("dev-develop", "b2"),
                ("dev-main", "b1"),
                ("v1.0.0", "t1"),
                ("v1.1.0", "t2"),
                ("v2.0.0-beta", "t3"),
            ]
            .map(|(v, i)| (v.to_string(), i.to_string()))
        );
    }

    #[tokio::test]
    async fn missing_repository_is_reported() {
        let harness = Harness::recording();
        assert!(harness.packages.enqueue_versions(URL, false).await.unwrap().is_none());
        assert!(matches!(
            harness.packages.refresh_packages(URL, false).await.unwrap_err(),
            Error::RepositoryNotFound { .. }
        ));
        assert!(matches!(
            harness.packages.refresh_package(URL, "v1.0.0", false).await.unwrap_err(),
            Error::RepositoryNotFound { .. }
        ));
        assert!(matches!(
            harness.packages.refresh_cache_packages(URL).await.unwrap_err(),
            Error::RepositoryNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn refresh_version_is_idempotent() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();

        let first = packages.refresh_version(CANONICAL, "t1", "v1.0.0", false).await.unwrap();
        assert_eq!(first, RefreshOutcome::Created);
        let stored = packages.packages.find_version(&name(), "1.0.0.0").await.unwrap().unwrap();
        assert_eq!(stored.pretty_version, "v1.0.0");
        assert_eq!(stored.reference, "t1");
        assert_eq!(stored.source.url, CANONICAL);
        assert!(stored.dist.url.ends_with("/repos/acme/foo/zipball/t1"));
        assert!(stored.composer.contains("\"library\""));

        for force in [false, true] {
            let again = packages.refresh_version(CANONICAL, "t1", "v1.0.0", force).await.unwrap();
            assert_eq!(again, RefreshOutcome::Unchanged);
        }
        let unchanged = packages.packages.find_version(&name(), "1.0.0.0").await.unwrap().unwrap();
        assert_eq!(unchanged.updated_at, stored.updated_at);

        let moved = packages.refresh_version(CANONICAL, "t2", "v1.0.0", false).await.unwrap();
        assert_eq!(moved, RefreshOutcome::Updated);
        let updated = packages.packages.find_version(&name(), "1.0.0.0").await.unwrap().unwrap();
        assert_eq!(updated.reference, "t2");
        assert_eq!(updated.created_at, stored.created_at);
    }

    #[tokio::test]
    async fn unusable_refs_are_skipped() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();

        let missing = packages.refresh_version(CANONICAL, "t9", "v9.0.0", false).await.unwrap();
        assert_eq!(missing, RefreshOutcome::Skipped);

        harness
            .rfs
            .insert(manifest_url(API, "t8"), r#"{"encoding":"none"}"#);
        let unreadable = packages.refresh_version(CANONICAL, "t8", "v8.0.0", false).await.unwrap();
        assert_eq!(unreadable, RefreshOutcome::Skipped);

        let bad = packages
            .refresh_version(CANONICAL, "t1", "not a version!", false)
            .await
            .unwrap();
        assert_eq!(bad, RefreshOutcome::Skipped);
        assert!(versions(packages).await.is_empty());
    }

    #[tokio::test]
    async fn refresh_package_resolves_tags_and_branches() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();

        let branch = packages.refresh_package(URL, "dev-develop", false).await.unwrap();
        assert_eq!(branch.outcome, RefreshOutcome::Created);
        assert_eq!(branch.record.url, CANONICAL);

        let tag = packages.refresh_package(URL, "v2.0.0-beta", false).await.unwrap();
        assert_eq!(tag.outcome, RefreshOutcome::Created);
        assert_eq!(versions(packages).await, ["2.0.0.0-beta", "dev-develop"]);

        let err = packages.refresh_package(URL, "v9.9.9", false).await.unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { version, .. } if version == "v9.9.9"));
    }

    #[tokio::test]
    async fn queued_refresh_stores_every_ref() {
        let harness = Harness::local();
        harness.repositories.enable(URL).await.unwrap();

        harness.packages.refresh_packages(URL, false).await.unwrap();
        let totals = harness.queue.idle().await;
        assert_eq!(totals.processed, 5);
        assert_eq!(totals.failed, 0);
        assert_eq!(
            versions(&harness.packages).await,
            ["1.0.0.0", "1.1.0.0", "2.0.0.0-beta", "dev-develop", "dev-main"]
        );
        harness.queue.shutdown();
    }

    #[tokio::test]
    async fn refresh_all_isolates_failing_repositories() {
        let harness = Harness::local();
        harness.repositories.enable(URL).await.unwrap();
        harness
            .repositories
            .enable("https://github.com/acme/broken")
            .await
            .unwrap();

        let results = harness.packages.refresh_all_packages(false).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.values().all(Result::is_ok));

        let totals = harness.queue.idle().await;
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.processed, 6);
        assert_eq!(versions(&harness.packages).await.len(), 5);
        harness.queue.shutdown();
    }

    #[tokio::test]
    async fn delete_by_url_or_name() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();
        packages.refresh_version(CANONICAL, "t1", "v1.0.0", false).await.unwrap();
        packages.refresh_version(CANONICAL, "t2", "v1.1.0", false).await.unwrap();

        let deleted = packages.delete_package(URL, "v1.0.0").await.unwrap();
        assert_eq!(deleted.package_name, Some(name()));
        assert_eq!(deleted.removed, 1);
        assert_eq!(packages.delete_package(URL, "v1.0.0").await.unwrap().removed, 0);

        harness.repositories.disable(URL).await.unwrap();
        let none = packages.delete_packages(URL).await.unwrap();
        assert_eq!(none.package_name, None);
        assert_eq!(none.removed, 0);

        let all = packages.delete_packages(NAME).await.unwrap();
        assert_eq!(all.removed, 1);
        assert!(versions(packages).await.is_empty());
    }

    #[tokio::test]
    async fn delete_by_url_uses_stored_package_name() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();
        packages.refresh_version(CANONICAL, "t1", "v1.0.0", false).await.unwrap();
        packages.refresh_version(CANONICAL, "t2", "v1.1.0", false).await.unwrap();

        harness.rfs.remove(API);
        let calls = harness.rfs.total_calls();
        let deleted = packages.delete_packages(URL).await.unwrap();
        assert_eq!(deleted.package_name, Some(name()));
        assert_eq!(deleted.removed, 2);
        assert_eq!(harness.rfs.total_calls(), calls);
    }

    #[tokio::test]
    async fn delete_by_url_survives_broken_root_manifest() {
        let harness = Harness::recording();
        harness.rfs.insert(manifest_url(API, "main"), contents("{not json"));
        harness.repositories.enable(URL).await.unwrap();

        let deleted = harness.packages.delete_packages(URL).await.unwrap();
        assert_eq!(deleted.package_name, None);
        assert_eq!(deleted.removed, 0);

        let deleted = harness.packages.delete_package(URL, "v1.0.0").await.unwrap();
        assert_eq!(deleted.package_name, None);
    }

    #[tokio::test]
    async fn versions_can_be_searched() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();
        for (sha, tag) in [("t1", "v1.0.0"), ("t2", "v1.1.0"), ("t3", "v2.0.0-beta")] {
            packages.refresh_version(CANONICAL, sha, tag, false).await.unwrap();
        }

        let page = packages.list_versions(&name(), Some("beta"), None, 0).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].pretty_version, "v2.0.0-beta");
        assert_eq!(
            packages.list_versions(&name(), Some("v1."), None, 0).await.unwrap().items.len(),
            2
        );
    }

    #[tokio::test]
    async fn cache_refresh_rereads_refs() {
        let harness = Harness::recording();
        let packages = &harness.packages;
        harness.repositories.enable(URL).await.unwrap();

        let (_, first) = packages.enqueue_versions(URL, false).await.unwrap().unwrap();
        set_tags(&harness.rfs, &[("v3.0.0", "t4")]);
        let (_, cached) = packages.enqueue_versions(URL, false).await.unwrap().unwrap();
        assert_eq!(first, 5);
        assert_eq!(cached, 5);

        let record = packages.refresh_cache_packages(URL).await.unwrap();
        assert_eq!(record.url, CANONICAL);
        let (_, fresh) = packages.enqueue_versions(URL, false).await.unwrap().unwrap();
        assert_eq!(fresh, 3);
        assert_eq!(packages.refresh_all_cache_packages().await, 1);
    }
}
