//! Embedded in-process configuration store.
//!
//! Values live in a concurrent map. Change notifications go through a bounded
//! queue drained by a dedicated dispatcher thread, so listeners run off the
//! publisher's thread the same way a network client delivers them from its
//! own workers.
//!
//! ```text
//! publish() -> values.insert() -> event queue
//!                                     |
//!                         dispatcher thread -> listeners[key]
//! ```

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::ChangeListener;
use super::ConfigItem;
use super::RemoteStore;
use super::StoreError;
use super::StoreResult;
use crate::ConfigKey;

/// Change notification queued for the dispatcher
#[derive(Debug, Clone)]
struct ChangeEvent {
    key: ConfigKey,
    content: String,
}

/// Call counters, mainly for tests and monitoring
#[derive(Debug, Default)]
pub struct StoreStats {
    pub fetches: AtomicUsize,
    pub searches: AtomicUsize,
    pub listens: AtomicUsize,
    pub publishes: AtomicUsize,
}

struct MemoryStoreInner {
    values: DashMap<ConfigKey, String>,
    listeners: DashMap<ConfigKey, Vec<ChangeListener>>,
    stats: StoreStats,
}

pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
    event_sender: Sender<ChangeEvent>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("values", &self.inner.values.len())
            .field("watched_keys", &self.inner.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store and starts its dispatcher thread
    pub fn new() -> Self {
        Self::with_queue_size(0)
    }

    /// Creates a store whose event queue holds at most `queue_size` pending
    /// notifications (`0` means unbounded). Publishing into a full queue fails
    /// with [`StoreError::QueueFull`] and leaves the stored value unchanged.
    pub fn with_queue_size(queue_size: usize) -> Self {
        let (event_sender, event_receiver) = if queue_size > 0 {
            bounded(queue_size)
        } else {
            unbounded()
        };
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let inner = Arc::new(MemoryStoreInner {
            values: DashMap::new(),
            listeners: DashMap::new(),
            stats: StoreStats::default(),
        });

        let dispatcher_inner = inner.clone();
        let handle = std::thread::spawn(move || {
            Self::run_dispatcher(dispatcher_inner, event_receiver, shutdown_rx)
        });

        Self {
            inner,
            event_sender,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            thread_handle: Mutex::new(Some(handle)),
        }
    }

    /// Stores a value without notifying listeners
    pub fn seed(
        &self,
        key: ConfigKey,
        content: impl Into<String>,
    ) {
        self.inner.values.insert(key, content.into());
    }

    /// Number of listeners registered for a key
    pub fn listener_count(
        &self,
        key: &ConfigKey,
    ) -> usize {
        self.inner.listeners.get(key).map(|l| l.len()).unwrap_or(0)
    }

    /// Number of distinct keys with at least one listener
    pub fn watched_key_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.inner.stats
    }

    /// Stops the dispatcher thread. Pending notifications are discarded.
    ///
    /// Calling `stop()` more than once is a no-op.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }

    fn run_dispatcher(
        inner: Arc<MemoryStoreInner>,
        events: Receiver<ChangeEvent>,
        shutdown: Receiver<()>,
    ) {
        debug!("Memory store dispatcher thread started");
        loop {
            crossbeam_channel::select! {
                recv(events) -> result => {
                    match result {
                        Ok(event) => Self::dispatch(&inner, event),
                        Err(_) => {
                            warn!("Memory store event channel closed");
                            break;
                        }
                    }
                }
                recv(shutdown) -> _ => {
                    debug!("Memory store dispatcher received shutdown signal");
                    break;
                }
            }
        }
        debug!("Memory store dispatcher thread stopped");
    }

    fn dispatch(
        inner: &MemoryStoreInner,
        event: ChangeEvent,
    ) {
        // Clone out so listeners can register further keys without deadlocking the shard
        let listeners = match inner.listeners.get(&event.key) {
            Some(listeners) => listeners.clone(),
            None => return,
        };

        for listener in &listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event.key, &event.content))).is_err() {
                error!(key = %event.key, "Change listener panicked");
            }
        }
        trace!(key = %event.key, listeners = listeners.len(), "Change dispatched");
    }

    fn ensure_concrete(key: &ConfigKey) -> StoreResult<()> {
        if key.group.is_empty() || key.id.is_empty() {
            return Err(StoreError::InvalidArgument("group and id must not be empty".into()));
        }
        if key.is_pattern() {
            return Err(StoreError::InvalidArgument(format!(
                "wildcard not allowed in concrete key {key}"
            )));
        }
        Ok(())
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch(
        &self,
        key: &ConfigKey,
    ) -> StoreResult<String> {
        self.inner.stats.fetches.fetch_add(1, Ordering::Relaxed);
        Self::ensure_concrete(key)?;

        self.inner
            .values
            .get(key)
            .map(|value| value.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn search(
        &self,
        pattern: &ConfigKey,
        page_no: usize,
        page_size: usize,
    ) -> StoreResult<Vec<ConfigItem>> {
        self.inner.stats.searches.fetch_add(1, Ordering::Relaxed);
        if page_no == 0 || page_size == 0 {
            return Err(StoreError::InvalidArgument(format!(
                "invalid page {page_no} of size {page_size}"
            )));
        }

        let mut hits: Vec<ConfigItem> = self
            .inner
            .values
            .iter()
            .filter(|entry| pattern.matches(entry.key()))
            .map(|entry| ConfigItem::new(&entry.key().group, &entry.key().id, entry.value().as_str()))
            .collect();
        // Stable order so pages never overlap
        hits.sort_by(|a, b| (&a.group, &a.id).cmp(&(&b.group, &b.id)));

        Ok(hits
            .into_iter()
            .skip((page_no - 1).saturating_mul(page_size))
            .take(page_size)
            .collect())
    }

    async fn listen(
        &self,
        key: &ConfigKey,
        listener: ChangeListener,
    ) -> StoreResult<()> {
        self.inner.stats.listens.fetch_add(1, Ordering::Relaxed);
        Self::ensure_concrete(key)?;

        self.inner.listeners.entry(key.clone()).or_default().push(listener);
        trace!(key = %key, "Listener registered");
        Ok(())
    }

    async fn publish(
        &self,
        key: &ConfigKey,
        content: &str,
    ) -> StoreResult<()> {
        self.inner.stats.publishes.fetch_add(1, Ordering::Relaxed);
        Self::ensure_concrete(key)?;

        // Entry guard keeps the stored value and the queued event in the same order
        let entry = self.inner.values.entry(key.clone());
        let event = ChangeEvent {
            key: key.clone(),
            content: content.to_string(),
        };
        match self.event_sender.try_send(event) {
            Ok(()) => {
                entry.insert(content.to_string());
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(key = %key, "Memory store event queue full, publish rejected");
                Err(StoreError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(StoreError::Closed),
        }
    }
}
