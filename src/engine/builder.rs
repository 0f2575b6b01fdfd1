use std::sync::Arc;

use super::ConfigMirror;
use crate::HandlerRegistry;
use crate::MirrorConfig;
use crate::RemoteStore;
use crate::Result;
use crate::SubscriptionConfig;

/// Step-by-step construction of an initialized [`ConfigMirror`]
pub struct MirrorBuilder<S: RemoteStore> {
    config: MirrorConfig,
    store: Arc<S>,
    registry: HandlerRegistry,
}

impl<S: RemoteStore> MirrorBuilder<S> {
    /// Create a new builder with default config over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self {
            config: MirrorConfig::default(),
            store,
            registry: HandlerRegistry::new(),
        }
    }

    /// Completely replaces the configuration, including any subscriptions
    /// added through [`subscribe`](Self::subscribe) so far.
    pub fn config(
        mut self,
        config: MirrorConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Appends one subscription declaration
    pub fn subscribe(
        mut self,
        group: impl Into<String>,
        id: impl Into<String>,
        handler: impl Into<String>,
    ) -> Self {
        self.config
            .subscribe
            .push(SubscriptionConfig::new(group, id, handler));
        self
    }

    /// Switch between live watches (default) and one-shot snapshots
    pub fn offline_mode(
        mut self,
        offline: bool,
    ) -> Self {
        self.config.local.offline_mode = offline;
        self
    }

    /// Registers a named handler
    pub fn handler<F>(
        mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&str, &str, &str) + Send + Sync + 'static,
    {
        self.registry.register(name, handler);
        self
    }

    /// Replaces the handler registry
    pub fn registry(
        mut self,
        registry: HandlerRegistry,
    ) -> Self {
        self.registry = registry;
        self
    }

    /// Validates the configuration and binds the subscriptions
    pub fn build(self) -> Result<ConfigMirror<S>> {
        let config = self.config.validate()?;
        let mut mirror = ConfigMirror::new(config, self.store);
        mirror.initialize(&self.registry)?;
        Ok(mirror)
    }
}
