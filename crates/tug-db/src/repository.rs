//! Namespaced access to a [`Database`].

use crate::engine::{Criteria, Database, Record, Results};
use std::sync::Arc;
use tug_core::{Error, Result};

/// One page of typed items.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items in id order.
    pub items: Vec<T>,
    /// Unprefixed id to resume after; `None` once exhausted.
    pub last_id: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            last_id: None,
        }
    }
}

/// A [`Database`] view confined to ids under `prefix:`.
#[derive(Debug, Clone)]
pub struct DatabaseRepository {
    db: Arc<dyn Database>,
    prefix: String,
}

impl DatabaseRepository {
    /// Create a view of `db` under `prefix`.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, prefix: impl Into<String>) -> Self {
        Self {
            db,
            prefix: prefix.into(),
        }
    }

    /// Namespace.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Underlying engine.
    #[must_use]
    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Storage id of `id`.
    ///
    /// # Errors
    /// Returns [`Error::Database`] for an empty id.
    pub fn prefixed_id(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(Error::Database(format!(
                "empty id in the \"{}\" namespace",
                self.prefix
            )));
        }
        Ok(format!("{}:{id}", self.prefix))
    }

    /// Unprefixed form of a storage id.
    #[must_use]
    pub fn strip_id<'a>(&self, id: &'a str) -> &'a str {
        id.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(id)
    }

    fn scan_prefix(&self) -> String {
        format!("{}:", self.prefix)
    }

    /// Whether `id` exists.
    ///
    /// # Errors
    /// Returns error if the id is invalid or the engine fails.
    pub async fn has(&self, id: &str) -> Result<bool> {
        let key = self.prefixed_id(id)?;
        self.db.has(&key).await
    }

    /// Fetch `id`.
    ///
    /// # Errors
    /// Returns error if the id is invalid or the engine fails.
    pub async fn get(&self, id: &str) -> Result<Option<Record>> {
        let key = self.prefixed_id(id)?;
        self.db.get(&key).await
    }

    /// Store `payload` under `id` with indexed `attributes`.
    ///
    /// # Errors
    /// Returns error if the id is invalid or the engine fails.
    pub async fn put(
        &self,
        id: &str,
        attributes: &[(&str, String)],
        payload: String,
    ) -> Result<()> {
        let mut record = Record::new(self.prefixed_id(id)?, payload);
        for (key, value) in attributes {
            record.attributes.insert((*key).to_string(), value.clone());
        }
        self.db.put(record).await
    }

    /// Remove `id`; returns whether it existed.
    ///
    /// # Errors
    /// Returns error if the id is invalid or the engine fails.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let key = self.prefixed_id(id)?;
        self.db.delete(&key).await
    }

    /// Keyset listing inside the namespace; `start_id` is unprefixed.
    ///
    /// # Errors
    /// Returns error if the engine fails.
    pub async fn find(
        &self,
        criteria: &Criteria,
        start_id: Option<&str>,
        limit: usize,
    ) -> Result<Results> {
        let start = start_id.map(|id| self.prefixed_id(id)).transpose()?;
        let mut results = self
            .db
            .find(criteria, &self.scan_prefix(), start.as_deref(), limit)
            .await?;
        results.last_id = results.last_id.map(|id| self.strip_id(&id).to_string());
        Ok(results)
    }

    /// First match inside the namespace.
    ///
    /// # Errors
    /// Returns error if the engine fails.
    pub async fn find_one(&self, criteria: &Criteria) -> Result<Option<Record>> {
        self.db.find_one(criteria, &self.scan_prefix()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    #[test]
    fn ids_are_namespaced() {
        let repo = DatabaseRepository::new(Arc::new(MemoryDatabase::new()), "package");
        assert_eq!(repo.prefixed_id("acme/foo@1.0.0.0").unwrap(), "package:acme/foo@1.0.0.0");
        assert_eq!(repo.strip_id("package:acme/foo@1.0.0.0"), "acme/foo@1.0.0.0");
        assert!(matches!(repo.prefixed_id("  "), Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn namespaces_do_not_leak() {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let packages = DatabaseRepository::new(db.clone(), "package");
        let repositories = DatabaseRepository::new(db, "repository");

        packages.put("a", &[("kind", "x".to_string())], "{}".into()).await.unwrap();
        repositories.put("a", &[("kind", "x".to_string())], "{}".into()).await.unwrap();

        assert!(packages.has("a").await.unwrap());
        assert_eq!(packages.find(&Criteria::new(), None, 0).await.unwrap().rows.len(), 1);

        assert!(packages.delete("a").await.unwrap());
        assert!(repositories.has("a").await.unwrap());
    }

    #[tokio::test]
    async fn resumes_from_unprefixed_id() {
        let repo = DatabaseRepository::new(Arc::new(MemoryDatabase::new()), "package");
        for id in ["a", "b", "c"] {
            repo.put(id, &[], "{}".into()).await.unwrap();
        }

        let first = repo.find(&Criteria::new(), None, 2).await.unwrap();
        assert_eq!(first.last_id.as_deref(), Some("b"));

        let rest = repo.find(&Criteria::new(), first.last_id.as_deref(), 2).await.unwrap();
        assert_eq!(rest.rows.len(), 1);
        assert_eq!(rest.rows[0].id, "package:c");
        assert!(rest.last_id.is_none());
    }
}
