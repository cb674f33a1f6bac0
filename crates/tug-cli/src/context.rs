//! Services shared by every command.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tug_config::Config;
use tug_db::{Database, MemoryDatabase, PackageRepository, RepositoryRepository};
use tug_queue::LocalMessageQueue;
use tug_repository::{PackageManager, RepositoryManager, receivers};
use tug_vcs::HttpRemoteFilesystem;

/// Snapshot file name inside the data directory.
const SNAPSHOT: &str = "tug.json";

/// Wired managers over one metadata snapshot.
#[derive(Debug)]
pub struct Context {
    pub repositories: Arc<RepositoryManager>,
    pub packages: Arc<PackageManager>,
    db: Arc<MemoryDatabase>,
    queue: LocalMessageQueue,
}

impl Context {
    /// Load the config, open the snapshot and subscribe the receivers.
    pub fn open(config_path: Option<&Path>, data_path: Option<PathBuf>) -> Result<Self> {
        let config = Arc::new(Config::resolve(config_path)?);
        let path = snapshot_path(&config, data_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let db = Arc::new(MemoryDatabase::open(&path)?);
        debug!(path = %path.display(), records = db.len(), "opened metadata snapshot");

        let rfs = Arc::new(HttpRemoteFilesystem::new(config.clone())?);
        let queue = LocalMessageQueue::new();

        let repositories = Arc::new(RepositoryManager::new(
            config.clone(),
            rfs,
            RepositoryRepository::new(db.clone(), config.database.repository_prefix.clone()),
        ));
        let packages = Arc::new(PackageManager::new(
            repositories.clone(),
            PackageRepository::new(db.clone(), config.database.package_prefix.clone()),
            Arc::new(queue.clone()),
            config.queue.delay(),
        ));
        receivers::subscribe(&queue, &packages);

        Ok(Self {
            repositories,
            packages,
            db,
            queue,
        })
    }

    /// Run queued jobs to completion, then persist the snapshot.
    pub async fn finish(&self) -> Result<()> {
        let totals = self.queue.idle().await;
        self.queue.shutdown();
        if totals.total() > 0 {
            info!(
                processed = totals.processed,
                failed = totals.failed,
                dropped = totals.dropped,
                "queue drained"
            );
        }

        self.db.flush().await?;
        Ok(())
    }
}

/// `--data`, then the configured path, then the platform data directory.
fn snapshot_path(config: &Config, data_path: Option<PathBuf>) -> PathBuf {
    data_path
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "tug").map_or_else(
                || std::env::temp_dir().join("tug").join(SNAPSHOT),
                |dirs| dirs.data_dir().join(SNAPSHOT),
            )
        })
}
