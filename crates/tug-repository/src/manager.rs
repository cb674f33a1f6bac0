//! Enabled repositories and their live drivers.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use tug_config::Config;
use tug_core::{PackageName, Result};
use tug_db::{Page, RepositoryRecord, RepositoryRepository};
use tug_vcs::{Driver, RemoteFilesystem, VcsDriver};

/// An enabled repository with its driver.
#[derive(Debug)]
pub struct Repository {
    record: RepositoryRecord,
    driver: Driver,
}

impl Repository {
    /// Canonical URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.record.url
    }

    /// Persisted state.
    #[must_use]
    pub const fn record(&self) -> &RepositoryRecord {
        &self.record
    }

    /// Package name discovered from the root manifest.
    #[must_use]
    pub const fn package_name(&self) -> Option<&PackageName> {
        self.record.package_name.as_ref()
    }

    /// Driver.
    #[must_use]
    pub const fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Driver, for calls that fill its cache.
    pub const fn driver_mut(&mut self) -> &mut Driver {
        &mut self.driver
    }

    /// Read the default branch and its manifest into the record.
    async fn initialize(&mut self, force: bool) -> Result<()> {
        if force {
            self.driver.invalidate();
        }

        let root = self.driver.root_identifier().await?;
        let manifest = match self.driver.composer_information(&root).await {
            Ok(manifest) => manifest,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        if let Some(name) = manifest.and_then(|m| m.package_name()) {
            self.record.package_name = Some(name);
        }
        self.record.last_root_identifier = Some(root);
        self.record.updated_at = Utc::now();

        debug!(
            url = %self.record.url,
            package = ?self.record.package_name.as_ref().map(ToString::to_string),
            "initialized repository"
        );
        Ok(())
    }
}

/// Shared handle; the mutex serializes work on one repository.
pub type RepositoryHandle = Arc<Mutex<Repository>>;

/// Owns enabled repositories.
#[derive(Debug)]
pub struct RepositoryManager {
    config: Arc<Config>,
    rfs: Arc<dyn RemoteFilesystem>,
    records: RepositoryRepository,
    live: DashMap<String, RepositoryHandle>,
    /// Initializations read, enable and disable write; a disable never
    /// interleaves with the record write-back of an initialization.
    lifecycle: RwLock<()>,
}

impl RepositoryManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        rfs: Arc<dyn RemoteFilesystem>,
        records: RepositoryRepository,
    ) -> Self {
        Self {
            config,
            rfs,
            records,
            live: DashMap::new(),
            lifecycle: RwLock::new(()),
        }
    }

    fn driver(&self, url: &str) -> Result<Driver> {
        Driver::for_url(url, &self.config, self.rfs.clone())
    }

    /// Canonical form of a repository URL.
    ///
    /// # Errors
    /// Returns [`tug_core::Error::UnsupportedRepository`] when no driver
    /// supports `url`.
    pub fn canonical_url(&self, url: &str) -> Result<String> {
        Ok(self.driver(url)?.url().to_string())
    }

    /// Enable a repository; enabling twice returns the existing record.
    ///
    /// # Errors
    /// Returns error if `url` is unsupported or the store fails.
    pub async fn enable(&self, url: &str) -> Result<RepositoryRecord> {
        let driver = self.driver(url)?;
        let canonical = driver.url().to_string();
        let _lifecycle = self.lifecycle.write().await;

        if let Some(record) = self.records.get(&canonical).await? {
            debug!(url = %canonical, "repository already enabled");
            return Ok(record);
        }

        let record = RepositoryRecord::new(&canonical, driver.kind().as_str());
        self.records.put(&record).await?;
        self.live.insert(
            canonical.clone(),
            Arc::new(Mutex::new(Repository {
                record: record.clone(),
                driver,
            })),
        );

        info!(url = %canonical, kind = %record.kind, "enabled repository");
        Ok(record)
    }

    /// Disable a repository. Its package versions are kept.
    ///
    /// # Errors
    /// Returns error if `url` is unsupported or the store fails.
    pub async fn disable(&self, url: &str) -> Result<Option<RepositoryRecord>> {
        let canonical = self.canonical_url(url)?;
        let _lifecycle = self.lifecycle.write().await;
        self.live.remove(&canonical);

        let record = self.records.get(&canonical).await?;
        if record.is_some() {
            self.records.delete(&canonical).await?;
            info!(url = %canonical, "disabled repository");
        }
        Ok(record)
    }

    /// Persisted record of an enabled repository.
    ///
    /// # Errors
    /// Returns error if `url` is unsupported or the store fails.
    pub async fn repository(&self, url: &str) -> Result<Option<RepositoryRecord>> {
        let canonical = self.canonical_url(url)?;
        self.records.get(&canonical).await
    }

    /// Enabled repository publishing `name`.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn find_repository(&self, name: &PackageName) -> Result<Option<RepositoryRecord>> {
        self.records.find_by_package(name).await
    }

    /// Keyset listing of enabled repositories.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn list(&self, start_id: Option<&str>, limit: usize) -> Result<Page<RepositoryRecord>> {
        self.records.list(start_id, limit).await
    }

    /// Every enabled repository.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn all_records(&self) -> Result<Vec<RepositoryRecord>> {
        self.records.all().await
    }

    /// Live repository for `url`, initialized.
    ///
    /// Returns `Ok(None)` when the repository is not enabled. Initialization
    /// reads the default branch and root manifest once; `force` clears the
    /// driver cache and reads them again.
    ///
    /// # Errors
    /// Returns error if `url` is unsupported or initialization fails.
    pub async fn get_and_init_repository(
        &self,
        url: &str,
        force: bool,
    ) -> Result<Option<RepositoryHandle>> {
        let canonical = self.canonical_url(url)?;
        let _lifecycle = self.lifecycle.read().await;
        let Some(record) = self.records.get(&canonical).await? else {
            debug!(url = %canonical, "repository is not enabled");
            self.live.remove(&canonical);
            return Ok(None);
        };

        let existing = self.live.get(&canonical).map(|entry| entry.value().clone());
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let repository = Repository {
                    record,
                    driver: self.driver(&canonical)?,
                };
                self.live
                    .entry(canonical.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(repository)))
                    .value()
                    .clone()
            }
        };

        {
            let mut repository = handle.lock().await;
            if force || !repository.record.is_initialized() {
                repository.initialize(force).await?;
                self.records.put(&repository.record).await?;
            }
        }

        Ok(Some(handle))
    }

    /// Clear the driver cache of `url`; returns whether a live driver existed.
    ///
    /// # Errors
    /// Returns error if `url` is unsupported.
    pub async fn invalidate(&self, url: &str) -> Result<bool> {
        let canonical = self.canonical_url(url)?;
        let handle = self.live.get(&canonical).map(|entry| entry.value().clone());
        match handle {
            Some(handle) => {
                handle.lock().await.driver.invalidate();
                debug!(url = %canonical, "invalidated driver cache");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Clear every live driver cache; returns how many were cleared.
    pub async fn invalidate_all(&self) -> usize {
        let handles: Vec<RepositoryHandle> =
            self.live.iter().map(|entry| entry.value().clone()).collect();
        for handle in &handles {
            handle.lock().await.driver.invalidate();
        }
        handles.len()
    }
}
