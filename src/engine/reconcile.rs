//! Reconciliation passes.
//!
//! Online: resolve every descriptor to concrete targets in declaration order,
//! register one listener per target (first claimant owns it), then drain
//! every target no listener has delivered yet with a snapshot fetch.
//! Listeners registered by an earlier pass are reused, so retrying after a
//! failed pass only registers what is still missing.
//!
//! Offline: fetch exact descriptors once; patterns are skipped because
//! searching needs a live store.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::delivery::invoke_handler;
use super::delivery::DeliveryTracker;
use crate::constants::FIRST_SEARCH_PAGE;
use crate::utils::ScopedTimer;
use crate::ChangeListener;
use crate::ConfigKey;
use crate::DescriptorKind;
use crate::Error;
use crate::Handler;
use crate::LocalCache;
use crate::Operation;
use crate::RemoteStore;
use crate::Result;
use crate::SubscriptionDescriptor;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Listeners registered with the store
    pub listeners: usize,
    /// Targets whose value came from a snapshot fetch
    pub fetched: usize,
    /// Targets dropped because an earlier descriptor already owned them
    pub duplicates: usize,
    /// Targets whose listener was registered by an earlier pass
    pub reused: usize,
    /// Descriptors not processed (patterns while offline)
    pub skipped: usize,
}

pub(crate) struct Reconciler<S: RemoteStore> {
    store: Arc<S>,
    cache: Arc<LocalCache>,
    tracker: Arc<DeliveryTracker>,
    page_size: usize,
}

impl<S: RemoteStore> Reconciler<S> {
    pub(crate) fn new(
        store: Arc<S>,
        cache: Arc<LocalCache>,
        tracker: Arc<DeliveryTracker>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            cache,
            tracker,
            page_size,
        }
    }

    pub(crate) async fn run_online(
        &self,
        descriptors: &[SubscriptionDescriptor],
    ) -> Result<ReconcileReport> {
        let _timer = ScopedTimer::new("reconcile::online");
        info!(descriptors = descriptors.len(), "Online reconciliation started");

        let mut report = ReconcileReport::default();
        let mut claimed: HashSet<ConfigKey> = HashSet::new();
        let mut resolved_patterns: HashSet<&ConfigKey> = HashSet::new();

        for descriptor in descriptors {
            match descriptor.kind() {
                DescriptorKind::Exact => {
                    self.register(&mut claimed, descriptor.key(), descriptor, &mut report)
                        .await?;
                }
                DescriptorKind::Pattern => {
                    if !resolved_patterns.insert(descriptor.key()) {
                        debug!(pattern = %descriptor.key(), "Pattern already resolved in this run");
                        continue;
                    }
                    let targets = self.resolve(descriptor.key()).await?;
                    debug!(
                        pattern = %descriptor.key(),
                        matches = targets.len(),
                        "Pattern resolved"
                    );
                    for target in &targets {
                        self.register(&mut claimed, target, descriptor, &mut report)
                            .await?;
                    }
                }
            }
        }

        report.fetched = self.drain().await?;

        info!(
            targets = self.tracker.len(),
            listeners = report.listeners,
            reused = report.reused,
            fetched = report.fetched,
            duplicates = report.duplicates,
            "Online reconciliation finished"
        );
        Ok(report)
    }

    pub(crate) async fn run_offline(
        &self,
        descriptors: &[SubscriptionDescriptor],
    ) -> Result<ReconcileReport> {
        let _timer = ScopedTimer::new("reconcile::offline");
        info!(descriptors = descriptors.len(), "Offline reconciliation started");

        let mut report = ReconcileReport::default();
        let mut seen: HashSet<&ConfigKey> = HashSet::new();

        for descriptor in descriptors {
            let key = descriptor.key();
            if descriptor.is_pattern() {
                debug!(pattern = %key, "Pattern subscription skipped while offline");
                report.skipped += 1;
                continue;
            }
            if !seen.insert(key) {
                debug!(key = %key, handler = descriptor.handler_name(), "Target already owned");
                report.duplicates += 1;
                continue;
            }

            let content = self
                .store
                .fetch(key)
                .await
                .map_err(|e| Error::resolution(Operation::Fetch, key, e))?;
            self.cache.insert(key.clone(), content.as_str());
            invoke_handler(descriptor.handler(), key, &content);
            report.fetched += 1;
        }

        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            "Offline reconciliation finished"
        );
        Ok(report)
    }

    /// Collects every concrete key matching `pattern`, page by page, until a
    /// short page signals the end.
    async fn resolve(
        &self,
        pattern: &ConfigKey,
    ) -> Result<Vec<ConfigKey>> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig(
                "local config search_page_size must be greater than 0".into(),
            ));
        }
        let mut targets = Vec::new();
        let mut page_no = FIRST_SEARCH_PAGE;

        loop {
            let page = self
                .store
                .search(pattern, page_no, self.page_size)
                .await
                .map_err(|e| Error::resolution(Operation::Search, pattern, e))?;
            let count = page.len();
            targets.extend(page.iter().map(|item| item.key()));

            if count < self.page_size {
                break;
            }
            page_no += 1;
        }
        Ok(targets)
    }

    async fn register(
        &self,
        claimed: &mut HashSet<ConfigKey>,
        target: &ConfigKey,
        descriptor: &SubscriptionDescriptor,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        if !claimed.insert(target.clone()) {
            debug!(key = %target, handler = descriptor.handler_name(), "Target already owned");
            report.duplicates += 1;
            return Ok(());
        }

        // Claim before listening so a notification fired during registration is tracked
        if !self.tracker.claim(target, descriptor.handler()) {
            debug!(key = %target, "Listener kept from an earlier pass");
            report.reused += 1;
            return Ok(());
        }

        let listener = self.listener_for(target.clone(), descriptor.handler().clone());
        if let Err(e) = self.store.listen(target, listener).await {
            self.tracker.release(target);
            return Err(Error::resolution(Operation::Listen, target, e));
        }

        debug!(key = %target, handler = descriptor.handler_name(), "Listener registered");
        report.listeners += 1;
        Ok(())
    }

    fn listener_for(
        &self,
        target: ConfigKey,
        handler: Handler,
    ) -> ChangeListener {
        let tracker = self.tracker.clone();
        let cache = self.cache.clone();
        Arc::new(move |_changed: &ConfigKey, content: &str| {
            match tracker.record_delivery(&target, || cache.insert(target.clone(), content)) {
                Some(ticket) => ticket.invoke(&handler, &target, content),
                None => invoke_handler(&handler, &target, content),
            }
        })
    }

    /// Fetches a snapshot for every target still waiting for its first value
    async fn drain(&self) -> Result<usize> {
        let mut fetched = 0;

        for (target, handler) in self.tracker.targets() {
            if !self.tracker.begin_drain(&target) {
                continue;
            }
            let content = match self.store.fetch(&target).await {
                Ok(content) => content,
                Err(e) => {
                    self.tracker.abort_drain(&target);
                    return Err(Error::resolution(Operation::Fetch, &target, e));
                }
            };

            match self
                .tracker
                .commit_drain(&target, || self.cache.insert(target.clone(), content.as_str()))
            {
                Some(ticket) => {
                    ticket.invoke(&handler, &target, &content);
                    fetched += 1;
                }
                None => debug!(key = %target, "Listener delivered during drain, snapshot discarded"),
            }
        }
        Ok(fetched)
    }
}
