//! The storage engine seam.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tug_core::{BoxFuture, Result};

/// A stored row.
///
/// `attributes` are the indexed fields criteria match against; `payload` is
/// the serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Full (prefixed) id.
    pub id: String,
    /// Indexed fields.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Serialized document.
    pub payload: String,
}

impl Record {
    /// Create a record without attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
            payload: payload.into(),
        }
    }

    /// Add an indexed field.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Attribute filter; an empty filter matches everything.
///
/// Equality conditions must all hold. A search term additionally has to
/// appear, ignoring case, in at least one of its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    equal: BTreeMap<String, String>,
    search: Option<(Vec<String>, String)>,
}

impl Criteria {
    /// Match everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key == value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equal.insert(key.into(), value.into());
        self
    }

    /// Require `term` inside one of `fields`; a blank term is ignored.
    #[must_use]
    pub fn search<I, S>(mut self, fields: I, term: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let term = term.trim();
        if !term.is_empty() {
            let fields = fields.into_iter().map(Into::into).collect();
            self.search = Some((fields, term.to_lowercase()));
        }
        self
    }

    /// Whether `record` satisfies every condition.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let equal = self
            .equal
            .iter()
            .all(|(key, value)| record.attributes.get(key) == Some(value));

        equal
            && self.search.as_ref().is_none_or(|(fields, term)| {
                fields.iter().any(|field| {
                    record
                        .attributes
                        .get(field)
                        .is_some_and(|value| value.to_lowercase().contains(term))
                })
            })
    }
}

/// One page of a keyset listing.
#[derive(Debug, Clone, Default)]
pub struct Results {
    /// Matching rows in id order.
    pub rows: Vec<Record>,
    /// Id to resume after; `None` once the listing is exhausted.
    pub last_id: Option<String>,
}

/// Key-value store holding Tug's records.
///
/// Ids are ordered lexicographically; listings resume strictly after
/// `start_id`.
pub trait Database: Send + Sync + std::fmt::Debug {
    /// Whether `id` exists.
    fn has<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Fetch `id`.
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Record>>>;

    /// Insert or replace a record.
    fn put(&self, record: Record) -> BoxFuture<'_, Result<()>>;

    /// Remove `id`; returns whether it existed.
    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// List records under `prefix` matching `criteria`, after `start_id`.
    fn find<'a>(
        &'a self,
        criteria: &'a Criteria,
        prefix: &'a str,
        start_id: Option<&'a str>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Results>>;

    /// First record under `prefix` matching `criteria`.
    fn find_one<'a>(
        &'a self,
        criteria: &'a Criteria,
        prefix: &'a str,
    ) -> BoxFuture<'a, Result<Option<Record>>> {
        Box::pin(async move {
            let results = self.find(criteria, prefix, None, 1).await?;
            Ok(results.rows.into_iter().next())
        })
    }

    /// Persist pending writes, if the engine buffers any.
    fn flush(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
