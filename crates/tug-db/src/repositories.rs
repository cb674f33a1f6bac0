//! Enabled repository records.

use crate::engine::{Criteria, Database, Record};
use crate::repository::{DatabaseRepository, Page};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tug_core::{PackageName, Result, json};

/// Page size used when walking every repository.
const BATCH: usize = 100;

/// Persisted state of an enabled repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    /// Canonical repository URL.
    pub url: String,
    /// Driver kind serving the repository.
    pub kind: String,
    /// Package name declared by the root manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<PackageName>,
    /// Default branch at the last initialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_root_identifier: Option<String>,
    /// When the repository was enabled.
    pub created_at: DateTime<Utc>,
    /// Last time the record changed.
    pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
    /// A freshly enabled, not yet initialized repository.
    #[must_use]
    pub fn new(url: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            url: url.into(),
            kind: kind.into(),
            package_name: None,
            last_root_identifier: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the root manifest has been read at least once.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.last_root_identifier.is_some()
    }
}

/// Store of [`RepositoryRecord`]s keyed by canonical URL.
#[derive(Debug, Clone)]
pub struct RepositoryRepository {
    inner: DatabaseRepository,
}

impl RepositoryRepository {
    /// Create the store under `prefix`.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, prefix: impl Into<String>) -> Self {
        Self {
            inner: DatabaseRepository::new(db, prefix),
        }
    }

    fn decode(record: &Record) -> Result<RepositoryRecord> {
        json::decode(&record.id, &record.payload)
    }

    /// Fetch by canonical URL.
    ///
    /// # Errors
    /// Returns error if the store fails or the record is corrupt.
    pub async fn get(&self, url: &str) -> Result<Option<RepositoryRecord>> {
        match self.inner.get(url).await? {
            Some(record) => Self::decode(&record).map(Some),
            None => Ok(None),
        }
    }

    /// Insert or replace a record.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn put(&self, record: &RepositoryRecord) -> Result<()> {
        let mut attributes = vec![("kind", record.kind.clone())];
        if let Some(name) = &record.package_name {
            attributes.push(("package", name.to_string()));
        }
        self.inner
            .put(&record.url, &attributes, json::encode(record)?)
            .await
    }

    /// Delete by canonical URL; returns whether it existed.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn delete(&self, url: &str) -> Result<bool> {
        self.inner.delete(url).await
    }

    /// Repository publishing `name`.
    ///
    /// # Errors
    /// Returns error if the store fails or the record is corrupt.
    pub async fn find_by_package(&self, name: &PackageName) -> Result<Option<RepositoryRecord>> {
        let criteria = Criteria::new().with("package", name.to_string());
        match self.inner.find_one(&criteria).await? {
            Some(record) => Self::decode(&record).map(Some),
            None => Ok(None),
        }
    }

    /// List records after `start_id` (a canonical URL).
    ///
    /// # Errors
    /// Returns error if the store fails or a record is corrupt.
    pub async fn list(&self, start_id: Option<&str>, limit: usize) -> Result<Page<RepositoryRecord>> {
        let results = self.inner.find(&Criteria::new(), start_id, limit).await?;
        Ok(Page {
            items: results
                .rows
                .iter()
                .map(Self::decode)
                .collect::<Result<_>>()?,
            last_id: results.last_id,
        })
    }

    /// Every record.
    ///
    /// # Errors
    /// Returns error if the store fails or a record is corrupt.
    pub async fn all(&self) -> Result<Vec<RepositoryRecord>> {
        let mut records = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let page = self.list(start.as_deref(), BATCH).await?;
            records.extend(page.items);
            match page.last_id {
                Some(last) => start = Some(last),
                None => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    fn store() -> RepositoryRepository {
        RepositoryRepository::new(Arc::new(MemoryDatabase::new()), "repository")
    }

    #[tokio::test]
    async fn round_trip_and_lookup_by_package() {
        let repositories = store();
        let mut record = RepositoryRecord::new("https://github.com/acme/foo.git", "github");
        assert!(!record.is_initialized());
        repositories.put(&record).await.unwrap();

        let name = PackageName::new("acme", "foo");
        assert!(repositories.find_by_package(&name).await.unwrap().is_none());

        record.package_name = Some(name.clone());
        record.last_root_identifier = Some("main".into());
        repositories.put(&record).await.unwrap();

        let found = repositories.find_by_package(&name).await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(found.is_initialized());

        assert!(repositories.delete(&record.url).await.unwrap());
        assert!(repositories.get(&record.url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_walks_every_page() {
        let repositories = store();
        for i in 0..(BATCH + 1) {
            let record = RepositoryRecord::new(format!("https://github.com/acme/r{i:03}.git"), "github");
            repositories.put(&record).await.unwrap();
        }

        let all = repositories.all().await.unwrap();
        assert_eq!(all.len(), BATCH + 1);
        assert_eq!(all[0].url, "https://github.com/acme/r000.git");
    }
}
