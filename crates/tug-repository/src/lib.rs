//! Repository and package managers for Tug.
//!
//! [`RepositoryManager`] tracks enabled repositories and keeps one live
//! driver per canonical URL. [`PackageManager`] turns branches and tags into
//! stored package versions, either directly or through `refresh-packages` and
//! `refresh-package` jobs handled by the [`receivers`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tug_config::Config;
//! use tug_db::{MemoryDatabase, PackageRepository, RepositoryRepository};
//! use tug_queue::LocalMessageQueue;
//! use tug_repository::{PackageManager, RepositoryManager, receivers};
//! use tug_vcs::HttpRemoteFilesystem;
//!
//! # async fn example() -> tug_core::Result<()> {
//! let config = Arc::new(Config::default());
//! let db = Arc::new(MemoryDatabase::new());
//! let rfs = Arc::new(HttpRemoteFilesystem::new(config.clone())?);
//! let queue = LocalMessageQueue::new();
//!
//! let repositories = Arc::new(RepositoryManager::new(
//!     config,
//!     rfs,
//!     RepositoryRepository::new(db.clone(), "repository"),
//! ));
//! let packages = Arc::new(PackageManager::new(
//!     repositories.clone(),
//!     PackageRepository::new(db, "package"),
//!     Arc::new(queue.clone()),
//!     None,
//! ));
//! receivers::subscribe(&queue, &packages);
//!
//! repositories.enable("https://github.com/acme/foo").await?;
//! packages.refresh_packages("https://github.com/acme/foo", false).await?;
//! queue.idle().await;
//! queue.shutdown();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[cfg(test)]
mod fixtures;
pub mod manager;
pub mod packages;
pub mod receivers;

pub use manager::{Repository, RepositoryHandle, RepositoryManager};
pub use packages::{PackageDeletion, PackageManager, PackageRefresh, RefreshOutcome};
pub use receivers::{RefreshPackageReceiver, RefreshPackagesReceiver};
