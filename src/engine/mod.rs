//! Reconciliation engine keeping a [`LocalCache`] in step with a
//! [`RemoteStore`].
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//! use d_mirror::{ConfigMirror, MemoryStore, MirrorConfig, SubscriptionConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut config = MirrorConfig::default();
//!     config.local.app_name = "billing".into();
//!     config.subscribe.push(SubscriptionConfig::new("APP", "db.url", "db"));
//!
//!     let mirror = ConfigMirror::builder(Arc::new(MemoryStore::new()))
//!         .config(config)
//!         .handler("db", |group, id, value| println!("{group}/{id} = {value}"))
//!         .build()
//!         .unwrap();
//!
//!     mirror.reconcile(true).await.unwrap();
//!     println!("{:?}", mirror.lookup("APP", "db.url"));
//! }
//! ```

mod builder;
mod delivery;
mod reconcile;

pub use builder::*;
pub use reconcile::ReconcileReport;


use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;

use self::delivery::DeliveryTracker;
use self::reconcile::Reconciler;
use crate::bind_subscriptions;
use crate::ConfigKey;
use crate::Error;
use crate::HandlerRegistry;
use crate::LocalCache;
use crate::MirrorConfig;
use crate::RemoteStore;
use crate::Result;
use crate::SubscriptionDescriptor;
use crate::SubscriptionError;

/// Local mirror of a remote configuration store
///
/// Owns the cache and a handle to the store adapter. Lifecycle:
/// 1. [`initialize`](Self::initialize) binds the declared subscriptions to handlers
/// 2. [`reconcile`](Self::reconcile) populates the cache and, online, keeps it live
/// 3. [`lookup`](Self::lookup) / [`publish`](Self::publish) at any time afterwards
pub struct ConfigMirror<S: RemoteStore> {
    config: Arc<MirrorConfig>,
    store: Arc<S>,
    cache: Arc<LocalCache>,
    /// Listener ownership, shared by every pass over this mirror
    tracker: Arc<DeliveryTracker>,
    descriptors: Option<Arc<[SubscriptionDescriptor]>>,
}

impl<S: RemoteStore> ConfigMirror<S> {
    /// Creates an uninitialized mirror over `store`
    pub fn new(
        config: MirrorConfig,
        store: Arc<S>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            cache: Arc::new(LocalCache::new()),
            tracker: Arc::new(DeliveryTracker::new()),
            descriptors: None,
        }
    }

    pub fn builder(store: Arc<S>) -> MirrorBuilder<S> {
        MirrorBuilder::new(store)
    }

    /// Binds every declared subscription to its handler in `registry`.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] for a zero search page size or a declaration
    ///   with an empty group, id or handler name
    /// - [`SubscriptionError::UnknownHandler`] if a handler name is not registered
    /// - [`SubscriptionError::AlreadyInitialized`] on a second call
    pub fn initialize(
        &mut self,
        registry: &HandlerRegistry,
    ) -> Result<()> {
        if self.descriptors.is_some() {
            return Err(SubscriptionError::AlreadyInitialized.into());
        }
        if self.config.local.search_page_size == 0 {
            return Err(Error::InvalidConfig(
                "local config search_page_size must be greater than 0".into(),
            ));
        }
        let descriptors = bind_subscriptions(&self.config.subscribe, registry)?;
        info!(
            subscriptions = descriptors.len(),
            description = %self.config.describe(),
            "Mirror initialized"
        );
        self.descriptors = Some(descriptors.into());
        Ok(())
    }

    /// Runs one reconciliation pass.
    ///
    /// Offline the pass always completes before returning. Online with
    /// `blocking = false` the pass runs on a spawned task and this returns
    /// immediately; failures of that task are only logged.
    pub async fn reconcile(
        &self,
        blocking: bool,
    ) -> Result<()> {
        let descriptors = self.descriptors()?;
        let reconciler = self.reconciler();

        if self.is_offline() {
            reconciler.run_offline(&descriptors).await?;
            return Ok(());
        }
        if blocking {
            reconciler.run_online(&descriptors).await?;
            return Ok(());
        }

        let _ = self.spawn_reconcile()?;
        Ok(())
    }

    /// Starts a pass on the tokio runtime and hands back its handle, which
    /// resolves to the pass's [`ReconcileReport`].
    ///
    /// The task logs its own failure, so dropping the handle is fine.
    pub fn spawn_reconcile(&self) -> Result<JoinHandle<Result<ReconcileReport>>> {
        let descriptors = self.descriptors()?;
        let reconciler = self.reconciler();
        let offline = self.is_offline();

        Ok(tokio::spawn(async move {
            let result = if offline {
                reconciler.run_offline(&descriptors).await
            } else {
                reconciler.run_online(&descriptors).await
            };
            result.inspect_err(|e| {
                error!("Background reconciliation failed: {}", e);
            })
        }))
    }

    /// Writes a value to the remote store.
    ///
    /// # Errors
    /// - [`Error::Offline`] in offline mode; the store is not contacted
    /// - [`Error::Store`] carrying the adapter's error unchanged
    pub async fn publish(
        &self,
        group: &str,
        id: &str,
        content: &str,
    ) -> Result<()> {
        if self.is_offline() {
            return Err(Error::Offline);
        }
        self.store
            .publish(&ConfigKey::new(group, id), content)
            .await
            .map_err(Error::Store)
    }

    /// Cached value, or `None` if nothing has been observed for the key yet
    pub fn lookup(
        &self,
        group: &str,
        id: &str,
    ) -> Option<String> {
        self.cache.get(group, id)
    }

    pub fn contains(
        &self,
        group: &str,
        id: &str,
    ) -> bool {
        self.cache.contains(group, id)
    }

    /// Cached value, empty when the key has not been observed
    pub fn get(
        &self,
        group: &str,
        id: &str,
    ) -> String {
        self.lookup(group, id).unwrap_or_default()
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn is_offline(&self) -> bool {
        self.config.local.offline_mode
    }

    pub fn is_initialized(&self) -> bool {
        self.descriptors.is_some()
    }

    pub fn descriptors(&self) -> Result<Arc<[SubscriptionDescriptor]>> {
        self.descriptors
            .clone()
            .ok_or_else(|| SubscriptionError::NotInitialized.into())
    }

    fn reconciler(&self) -> Reconciler<S> {
        Reconciler::new(
            self.store.clone(),
            self.cache.clone(),
            self.tracker.clone(),
            self.config.local.search_page_size,
        )
    }
}
