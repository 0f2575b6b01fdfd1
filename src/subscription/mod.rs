//! Subscription declarations and their bound callbacks.
//!
//! A subscription names a `(group, id)` pair, either literal ("exact") or
//! containing the `*` wildcard ("pattern"), and the name of the handler that
//! receives every value observed for it. Declarations come from
//! [`SubscriptionConfig`](crate::SubscriptionConfig) and are bound once, at
//! initialization, against a [`HandlerRegistry`].

mod handler;
mod key;

pub use handler::*;
pub use key::*;


use std::fmt;

use tracing::debug;

use crate::Result;
use crate::SubscriptionConfig;
use crate::SubscriptionError;

/// Addressing mode of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Exact,
    Pattern,
}

/// A validated subscription bound to its callback
#[derive(Clone)]
pub struct SubscriptionDescriptor {
    key: ConfigKey,
    handler_name: String,
    handler: Handler,
}

impl SubscriptionDescriptor {
    pub fn new(
        key: ConfigKey,
        handler_name: impl Into<String>,
        handler: Handler,
    ) -> Self {
        Self {
            key,
            handler_name: handler_name.into(),
            handler,
        }
    }

    /// Declared key, possibly containing wildcards
    pub fn key(&self) -> &ConfigKey {
        &self.key
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn kind(&self) -> DescriptorKind {
        if self.key.is_pattern() {
            DescriptorKind::Pattern
        } else {
            DescriptorKind::Exact
        }
    }

    pub fn is_pattern(&self) -> bool {
        self.kind() == DescriptorKind::Pattern
    }
}

impl fmt::Debug for SubscriptionDescriptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SubscriptionDescriptor")
            .field("key", &self.key)
            .field("handler_name", &self.handler_name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Binds each declaration to its handler, preserving declaration order.
///
/// Fails on the first declaration that is malformed (empty group, id or
/// handler name) or whose handler name is not registered.
pub fn bind_subscriptions(
    declarations: &[SubscriptionConfig],
    registry: &HandlerRegistry,
) -> Result<Vec<SubscriptionDescriptor>> {
    declarations
        .iter()
        .map(|declaration| -> Result<SubscriptionDescriptor> {
            declaration.validate()?;
            let handler = registry.resolve(&declaration.handler).ok_or_else(|| {
                SubscriptionError::UnknownHandler {
                    name: declaration.handler.clone(),
                }
            })?;
            let descriptor = SubscriptionDescriptor::new(
                ConfigKey::new(&declaration.group, &declaration.id),
                &declaration.handler,
                handler,
            );
            debug!(
                key = %descriptor.key(),
                handler = descriptor.handler_name(),
                kind = ?descriptor.kind(),
                "Subscription bound"
            );
            Ok(descriptor)
        })
        .collect()
}
