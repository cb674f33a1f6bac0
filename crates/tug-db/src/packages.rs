//! Package version records.

use crate::engine::{Criteria, Database, Record};
use crate::repository::{DatabaseRepository, Page};
use std::sync::Arc;
use tracing::debug;
use tug_core::{PackageName, PackageVersion, Result, json, version_id};

/// Page size used when walking a whole package.
const BATCH: usize = 100;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No record existed.
    Created,
    /// The stored content changed.
    Updated,
    /// The stored content already matched; nothing was written.
    Unchanged,
}

/// Store of [`PackageVersion`] records keyed by `name@version`.
#[derive(Debug, Clone)]
pub struct PackageRepository {
    inner: DatabaseRepository,
}

impl PackageRepository {
    /// Create the store under `prefix`.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, prefix: impl Into<String>) -> Self {
        Self {
            inner: DatabaseRepository::new(db, prefix),
        }
    }

    fn decode(record: &Record) -> Result<PackageVersion> {
        json::decode(&record.id, &record.payload)
    }

    /// Insert or update a version.
    ///
    /// When the content is unchanged nothing is written, so timestamps stay as
    /// they were. An update keeps the original `created_at`.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn upsert(&self, mut version: PackageVersion) -> Result<WriteOutcome> {
        let id = version.id();
        let outcome = match self.find_version(&version.name, &version.version).await? {
            Some(existing) if existing.same_content(&version) => {
                debug!(id = %id, "version unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
            Some(existing) => {
                version.created_at = existing.created_at;
                WriteOutcome::Updated
            }
            None => WriteOutcome::Created,
        };

        let attributes = [
            ("name", version.name.to_string()),
            ("version", version.version.clone()),
            ("pretty_version", version.pretty_version.clone()),
            ("reference", version.reference.clone()),
        ];
        self.inner
            .put(&id, &attributes, json::encode(&version)?)
            .await?;

        debug!(id = %id, ?outcome, "stored version");
        Ok(outcome)
    }

    /// Fetch one version.
    ///
    /// # Errors
    /// Returns error if the store fails or the record is corrupt.
    pub async fn find_version(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<Option<PackageVersion>> {
        match self.inner.get(&version_id(name, version)).await? {
            Some(record) => Self::decode(&record).map(Some),
            None => Ok(None),
        }
    }

    /// Delete one version; a missing record is a no-op.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn delete_version(&self, name: &PackageName, version: &str) -> Result<bool> {
        self.inner.delete(&version_id(name, version)).await
    }

    /// Delete every version of `name`; returns how many were removed.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn delete_all(&self, name: &PackageName) -> Result<usize> {
        let criteria = Self::criteria(name);
        let mut removed = 0;

        loop {
            let results = self.inner.find(&criteria, None, BATCH).await?;
            if results.rows.is_empty() {
                break;
            }
            for row in &results.rows {
                if self.inner.database().delete(&row.id).await? {
                    removed += 1;
                }
            }
            if results.last_id.is_none() {
                break;
            }
        }

        Ok(removed)
    }

    /// List versions of `name` after `start_id`.
    ///
    /// `search` keeps versions whose pretty or normalized version contains it.
    ///
    /// # Errors
    /// Returns error if the store fails or a record is corrupt.
    pub async fn list(
        &self,
        name: &PackageName,
        search: Option<&str>,
        start_id: Option<&str>,
        limit: usize,
    ) -> Result<Page<PackageVersion>> {
        let mut criteria = Self::criteria(name);
        if let Some(term) = search {
            criteria = criteria.search(["version", "pretty_version"], term);
        }
        let results = self.inner.find(&criteria, start_id, limit).await?;

        Ok(Page {
            items: results
                .rows
                .iter()
                .map(Self::decode)
                .collect::<Result<_>>()?,
            last_id: results.last_id,
        })
    }

    fn criteria(name: &PackageName) -> Criteria {
        Criteria::new().with("name", name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;
    use chrono::{Duration, Utc};
    use tug_core::{Dist, Source};

    fn version(name: &str, version: &str, pretty: &str, reference: &str) -> PackageVersion {
        let now = Utc::now();
        PackageVersion {
            name: PackageName::parse(name).unwrap(),
            version: version.to_string(),
            pretty_version: pretty.to_string(),
            reference: reference.to_string(),
            composer: format!(r#"{{"name":"{name}"}}"#),
            source: Source {
                kind: "git".into(),
                url: "https://github.com/acme/foo.git".into(),
                reference: reference.into(),
            },
            dist: Dist {
                kind: "zip".into(),
                url: format!("https://api.github.com/repos/acme/foo/zipball/{reference}"),
                reference: reference.into(),
                shasum: String::new(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn store() -> PackageRepository {
        PackageRepository::new(Arc::new(MemoryDatabase::new()), "package")
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let packages = store();
        let first = version("acme/foo", "1.0.0.0", "v1.0.0", "abc");
        let stored_at = first.updated_at;

        assert_eq!(packages.upsert(first.clone()).await.unwrap(), WriteOutcome::Created);

        let mut again = first.clone();
        again.updated_at = stored_at + Duration::hours(1);
        assert_eq!(packages.upsert(again).await.unwrap(), WriteOutcome::Unchanged);

        let name = PackageName::new("acme", "foo");
        let stored = packages.find_version(&name, "1.0.0.0").await.unwrap().unwrap();
        assert_eq!(stored.updated_at, stored_at);

        let mut moved = first.clone();
        moved.reference = "def".into();
        moved.created_at = stored_at + Duration::hours(2);
        moved.updated_at = stored_at + Duration::hours(2);
        assert_eq!(packages.upsert(moved).await.unwrap(), WriteOutcome::Updated);

        let stored = packages.find_version(&name, "1.0.0.0").await.unwrap().unwrap();
        assert_eq!(stored.reference, "def");
        assert_eq!(stored.created_at, stored_at);
        assert_eq!(stored.updated_at, stored_at + Duration::hours(2));
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let packages = store();
        let name = PackageName::new("acme", "foo");
        assert!(!packages.delete_version(&name, "1.0.0.0").await.unwrap());
        assert_eq!(packages.delete_all(&name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_all_spans_pages() {
        let packages = store();
        for i in 0..(BATCH + 5) {
            let v = format!("1.{i}.0.0");
            packages
                .upsert(version("acme/foo", &v, &format!("v1.{i}.0"), "abc"))
                .await
                .unwrap();
        }
        packages
            .upsert(version("acme/bar", "1.0.0.0", "v1.0.0", "abc"))
            .await
            .unwrap();

        let foo = PackageName::new("acme", "foo");
        assert_eq!(packages.delete_all(&foo).await.unwrap(), BATCH + 5);
        assert!(packages.list(&foo, None, None, 0).await.unwrap().items.is_empty());

        let bar = PackageName::new("acme", "bar");
        assert_eq!(packages.list(&bar, None, None, 0).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn list_pages_by_id() {
        let packages = store();
        for (v, pretty) in [("1.0.0.0", "v1.0.0"), ("2.0.0.0", "v2.0.0"), ("9999999-dev", "dev-main")] {
            packages
                .upsert(version("acme/foo", v, pretty, "abc"))
                .await
                .unwrap();
        }

        let name = PackageName::new("acme", "foo");
        let page = packages.list(&name, None, None, 2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.last_id.as_deref(), Some("acme/foo@2.0.0.0"));

        let rest = packages.list(&name, None, page.last_id.as_deref(), 2).await.unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].pretty_version, "dev-main");
    }

    #[tokio::test]
    async fn list_filters_by_search() {
        let packages = store();
        for (v, pretty) in [
            ("1.0.0.0", "v1.0.0"),
            ("1.1.0.0", "v1.1.0"),
            ("2.0.0.0", "v2.0.0"),
            ("dev-main", "dev-main"),
        ] {
            packages
                .upsert(version("acme/foo", v, pretty, "abc"))
                .await
                .unwrap();
        }
        let name = PackageName::new("acme", "foo");

        let page = packages.list(&name, Some("V1."), None, 0).await.unwrap();
        let found: Vec<_> = page.items.iter().map(|v| v.pretty_version.as_str()).collect();
        assert_eq!(found, vec!["v1.0.0", "v1.1.0"]);

        let page = packages.list(&name, Some("1.0"), None, 1).await.unwrap();
        assert_eq!(page.items[0].version, "1.0.0.0");
        let rest = packages
            .list(&name, Some("1.0"), page.last_id.as_deref(), 1)
            .await
            .unwrap();
        assert_eq!(rest.items[0].version, "1.1.0.0");

        assert!(packages.list(&name, Some("beta"), None, 0).await.unwrap().items.is_empty());
        assert_eq!(packages.list(&name, Some(""), None, 0).await.unwrap().items.len(), 4);
    }
}
