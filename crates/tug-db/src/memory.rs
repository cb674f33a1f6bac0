//! In-process engine with an optional JSON snapshot on disk.

use crate::engine::{Criteria, Database, Record, Results};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Write;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use tug_core::{BoxFuture, Error, Result};

/// Ordered in-memory store.
///
/// When opened on a path, [`Database::flush`] rewrites the snapshot
/// atomically if anything changed since the last flush.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    records: RwLock<BTreeMap<String, Record>>,
    path: Option<PathBuf>,
    dirty: AtomicBool,
}

impl MemoryDatabase {
    /// Create an empty, purely in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by the snapshot at `path`, loading it if present.
    ///
    /// # Errors
    /// Returns error if an existing snapshot cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut records = BTreeMap::new();

        if path.exists() {
            let data = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
            let rows: Vec<Record> = sonic_rs::from_slice(&data)?;
            records.extend(rows.into_iter().map(|row| (row.id.clone(), row)));
            debug!(path = %path.display(), records = records.len(), "loaded snapshot");
        }

        Ok(Self {
            records: RwLock::new(records),
            path: Some(path),
            dirty: AtomicBool::new(false),
        })
    }

    /// Snapshot location.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn scan(
        &self,
        criteria: &Criteria,
        prefix: &str,
        start_id: Option<&str>,
        limit: usize,
    ) -> Results {
        let records = self.records.read();
        let lower = start_id.map_or_else(
            || Bound::Included(prefix.to_string()),
            |start| Bound::Excluded(start.to_string()),
        );

        let mut rows = Vec::new();
        for (id, record) in records.range::<String, _>((lower, Bound::Unbounded)) {
            if !id.starts_with(prefix) {
                if id.as_str() > prefix {
                    break;
                }
                continue;
            }
            if !criteria.matches(record) {
                continue;
            }
            rows.push(record.clone());
            if limit > 0 && rows.len() > limit {
                break;
            }
        }

        let mut last_id = None;
        if limit > 0 && rows.len() > limit {
            rows.truncate(limit);
            last_id = rows.last().map(|row| row.id.clone());
        }

        Results { rows, last_id }
    }

    fn write_snapshot(&self, path: &Path) -> Result<()> {
        let rows: Vec<Record> = self.records.read().values().cloned().collect();
        let data = sonic_rs::to_string_pretty(&rows)?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        file.write_all(data.as_bytes())
            .map_err(|e| Error::io(file.path(), e))?;
        file.persist(path).map_err(|e| Error::io(path, e.error))?;

        debug!(path = %path.display(), records = rows.len(), "wrote snapshot");
        Ok(())
    }
}

impl Database for MemoryDatabase {
    fn has<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>> {
        let found = self.records.read().contains_key(id);
        Box::pin(async move { Ok(found) })
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Record>>> {
        let record = self.records.read().get(id).cloned();
        Box::pin(async move { Ok(record) })
    }

    fn put(&self, record: Record) -> BoxFuture<'_, Result<()>> {
        self.records.write().insert(record.id.clone(), record);
        self.dirty.store(true, Ordering::Release);
        Box::pin(async { Ok(()) })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>> {
        let removed = self.records.write().remove(id).is_some();
        if removed {
            self.dirty.store(true, Ordering::Release);
        }
        Box::pin(async move { Ok(removed) })
    }

    fn find<'a>(
        &'a self,
        criteria: &'a Criteria,
        prefix: &'a str,
        start_id: Option<&'a str>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Results>> {
        let results = self.scan(criteria, prefix, start_id, limit);
        Box::pin(async move { Ok(results) })
    }

    fn flush(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(path) = &self.path else {
                return Ok(());
            };
            if self.dirty.swap(false, Ordering::AcqRel)
                && let Err(e) = self.write_snapshot(path)
            {
                self.dirty.store(true, Ordering::Release);
                return Err(e);
            }
            Ok(())
        })
    }
}
