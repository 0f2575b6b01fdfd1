//! In-memory mirror of observed configuration values.
//!
//! Entries are never evicted: every `(group, id)` keeps its last observed
//! content until the process exits. Reads take a shared lock and writes an
//! exclusive one, so concurrent listener callbacks and lookups never observe
//! a torn update.


use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::ConfigKey;

#[derive(Debug, Default)]
pub struct LocalCache {
    entries: RwLock<HashMap<ConfigKey, String>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the value stored for `key` (last write wins)
    pub fn insert(
        &self,
        key: ConfigKey,
        content: impl Into<String>,
    ) {
        let content = content.into();
        trace!(key = %key, len = content.len(), "Cache updated");
        self.entries.write().insert(key, content);
    }

    pub fn contains(
        &self,
        group: &str,
        id: &str,
    ) -> bool {
        self.entries.read().contains_key(&ConfigKey::new(group, id))
    }

    /// Returns the cached value, `None` meaning "not yet observed"
    pub fn get(
        &self,
        group: &str,
        id: &str,
    ) -> Option<String> {
        self.entries.read().get(&ConfigKey::new(group, id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Point-in-time copy of every entry
    pub fn snapshot(&self) -> HashMap<ConfigKey, String> {
        self.entries.read().clone()
    }
}
