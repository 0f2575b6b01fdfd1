//! Remote store adapter boundary.
//!
//! The mirror consumes exactly four primitives from the configuration store:
//! fetch one value, page through pattern search results, register a change
//! listener, and publish a value. [`RemoteStore`] captures them so the
//! reconciliation engine can run against any client (a network SDK, or the
//! embedded [`MemoryStore`]).
//!
//! # Delivery Guarantees
//!
//! Listeners may fire zero or more times, on threads owned by the adapter,
//! concurrently for different keys. The engine assumes at-least-once delivery
//! of change notifications and does not rely on a notification being sent at
//! registration time.

mod error;
mod memory;

pub use error::*;
pub use memory::*;


use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::ConfigKey;

/// Callback registered with [`RemoteStore::listen`], invoked with the key
/// that changed and its new content.
pub type ChangeListener = Arc<dyn Fn(&ConfigKey, &str) + Send + Sync>;

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub group: String,
    pub id: String,
    #[serde(default)]
    pub content: String,
}

impl ConfigItem {
    pub fn new(
        group: impl Into<String>,
        id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
            content: content.into(),
        }
    }

    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(&self.group, &self.id)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Reads the current content of a concrete key.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if the key has never been published
    /// - Transport specific errors otherwise
    async fn fetch(
        &self,
        key: &ConfigKey,
    ) -> StoreResult<String>;

    /// Returns one page of keys matching a wildcard pattern.
    ///
    /// Pages are numbered from 1. A page shorter than `page_size` is the last
    /// one; callers keep requesting until they see it.
    async fn search(
        &self,
        pattern: &ConfigKey,
        page_no: usize,
        page_size: usize,
    ) -> StoreResult<Vec<ConfigItem>>;

    /// Registers `listener` for every future change of a concrete key.
    ///
    /// The registration lives as long as the store.
    async fn listen(
        &self,
        key: &ConfigKey,
        listener: ChangeListener,
    ) -> StoreResult<()>;

    /// Writes `content` under a concrete key
    async fn publish(
        &self,
        key: &ConfigKey,
        content: &str,
    ) -> StoreResult<()>;
}
