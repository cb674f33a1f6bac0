//! Per-driver memo of everything fetched from the VCS host.

use crate::driver::RepositoryData;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tug_core::ComposerManifest;

/// Cached driver state.
///
/// Lives as long as its driver; only [`DriverCache::invalidate`] or a process
/// restart clears it.
#[derive(Debug, Default)]
pub struct DriverCache {
    /// Repository metadata.
    pub repo_data: Option<RepositoryData>,
    /// Default branch.
    pub root_identifier: Option<String>,
    /// Tag name to commit.
    pub tags: Option<BTreeMap<String, String>>,
    /// Branch name to commit.
    pub branches: Option<BTreeMap<String, String>>,
    /// Composer manifests by reference; `None` marks a reference without one.
    pub info: HashMap<String, Option<Arc<ComposerManifest>>>,
}

impl DriverCache {
    /// Drop every cached value.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Whether nothing has been fetched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repo_data.is_none()
            && self.root_identifier.is_none()
            && self.tags.is_none()
            && self.branches.is_none()
            && self.info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_clears_everything() {
        let mut cache = DriverCache {
            root_identifier: Some("main".into()),
            tags: Some(BTreeMap::from([("v1.0.0".into(), "abc".into())])),
            ..DriverCache::default()
        };
        cache.info.insert("main".into(), None);
        assert!(!cache.is_empty());

        cache.invalidate();
        assert!(cache.is_empty());
    }
}
