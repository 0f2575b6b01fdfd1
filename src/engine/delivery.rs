//! Delivery bookkeeping shared between listener callbacks and the drain step.
//!
//! Every claimed target moves through
//!
//! ```text
//! Pending --begin_drain--> Draining --commit_drain--> Delivered
//!    ^  \                    |  \
//!    |   +--------------------|---+--- record_delivery ---> Delivered
//!    +----- abort_drain ------+
//! ```
//!
//! All transitions and the cache writes that accompany them happen under one
//! lock, so a drained snapshot can never overwrite a value a listener already
//! delivered, and a target is never drained after a notification arrived.
//!
//! The tracker lives as long as the mirror. Targets claimed by an earlier
//! pass keep their listener, so a retried pass neither listens twice nor
//! forgets a target that still needs its first value.
//!
//! Each write hands out a [`DeliveryTicket`] numbered per target. Handlers run
//! outside the tracker lock, behind a per-target gate that drops tickets older
//! than the last one invoked, so a handler never sees a value older than one
//! it already received.

use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;

use crate::ConfigKey;
use crate::Handler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Listener registered, no value observed yet
    Pending,
    /// Snapshot fetch in flight
    Draining,
    /// A value reached the cache and the owner's handler
    Delivered,
}

struct Target {
    handler: Handler,
    state: Delivery,
    /// Number of writes recorded for this target
    generation: u64,
    /// Generation of the last handler invocation
    gate: Arc<Mutex<u64>>,
}

impl Target {
    fn next_ticket(&mut self) -> DeliveryTicket {
        self.generation += 1;
        DeliveryTicket {
            generation: self.generation,
            gate: self.gate.clone(),
        }
    }
}

/// Permission to run the owner's handler for one recorded write
#[must_use]
pub(crate) struct DeliveryTicket {
    generation: u64,
    gate: Arc<Mutex<u64>>,
}

impl DeliveryTicket {
    /// Invokes `handler` unless a newer write of the same target got there first
    pub(crate) fn invoke(
        self,
        handler: &Handler,
        key: &ConfigKey,
        content: &str,
    ) {
        let mut last = self.gate.lock();
        if *last >= self.generation {
            debug!(key = %key, generation = self.generation, "Stale delivery skipped");
            return;
        }
        *last = self.generation;
        invoke_handler(handler, key, content);
    }
}

#[derive(Default)]
struct TrackerState {
    /// Claim order, which is also drain order
    order: Vec<ConfigKey>,
    targets: HashMap<ConfigKey, Target>,
}

#[derive(Default)]
pub(crate) struct DeliveryTracker {
    state: Mutex<TrackerState>,
}

impl DeliveryTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims `key` for `handler`. Returns `false` when an earlier claim owns it.
    pub(crate) fn claim(
        &self,
        key: &ConfigKey,
        handler: &Handler,
    ) -> bool {
        let mut state = self.state.lock();
        if state.targets.contains_key(key) {
            return false;
        }
        state.order.push(key.clone());
        state.targets.insert(
            key.clone(),
            Target {
                handler: handler.clone(),
                state: Delivery::Pending,
                generation: 0,
                gate: Arc::new(Mutex::new(0)),
            },
        );
        true
    }

    /// Drops a claim whose listener could not be registered
    pub(crate) fn release(
        &self,
        key: &ConfigKey,
    ) {
        let mut state = self.state.lock();
        if state.targets.remove(key).is_some() {
            state.order.retain(|claimed| claimed != key);
        }
    }

    /// Marks `key` delivered and runs `write` while holding the lock.
    ///
    /// Returns `None` for a key this tracker never claimed; the write still
    /// happens.
    pub(crate) fn record_delivery(
        &self,
        key: &ConfigKey,
        write: impl FnOnce(),
    ) -> Option<DeliveryTicket> {
        let mut state = self.state.lock();
        write();
        state.targets.get_mut(key).map(|target| {
            target.state = Delivery::Delivered;
            target.next_ticket()
        })
    }

    /// Pending -> Draining. Returns `false` if the target needs no snapshot.
    pub(crate) fn begin_drain(
        &self,
        key: &ConfigKey,
    ) -> bool {
        let mut state = self.state.lock();
        match state.targets.get_mut(key) {
            Some(target) if target.state == Delivery::Pending => {
                target.state = Delivery::Draining;
                true
            }
            _ => false,
        }
    }

    /// Draining -> Pending, after a failed snapshot fetch
    pub(crate) fn abort_drain(
        &self,
        key: &ConfigKey,
    ) {
        let mut state = self.state.lock();
        if let Some(target) = state.targets.get_mut(key) {
            if target.state == Delivery::Draining {
                target.state = Delivery::Pending;
            }
        }
    }

    /// Draining -> Delivered, running `write` under the lock.
    ///
    /// Returns `None` without writing when a listener delivered first.
    pub(crate) fn commit_drain(
        &self,
        key: &ConfigKey,
        write: impl FnOnce(),
    ) -> Option<DeliveryTicket> {
        let mut state = self.state.lock();
        match state.targets.get_mut(key) {
            Some(target) if target.state == Delivery::Draining => {
                target.state = Delivery::Delivered;
                write();
                Some(target.next_ticket())
            }
            _ => None,
        }
    }

    /// Claimed targets with their owning handler, in claim order
    pub(crate) fn targets(&self) -> Vec<(ConfigKey, Handler)> {
        let state = self.state.lock();
        state
            .order
            .iter()
            .filter_map(|key| state.targets.get(key).map(|t| (key.clone(), t.handler.clone())))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn state_of(
        &self,
        key: &ConfigKey,
    ) -> Option<Delivery> {
        self.state.lock().targets.get(key).map(|t| t.state)
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().order.len()
    }
}

/// Calls a subscription handler, containing any panic it raises
pub(crate) fn invoke_handler(
    handler: &Handler,
    key: &ConfigKey,
    content: &str,
) {
    if catch_unwind(AssertUnwindSafe(|| handler(&key.group, &key.id, content))).is_err() {
        error!(key = %key, "Subscription handler panicked");
    }
}
