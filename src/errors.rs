//! Mirror Error Hierarchy
//!
//! Defines the error types raised while loading configuration, binding
//! subscriptions, reconciling against the remote store and publishing.

use config::ConfigError;
use tokio::task::JoinError;

use crate::ConfigKey;
use crate::StoreError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration source loading or deserialization failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Semantic validation failures of an otherwise well-formed configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Handler binding and engine lifecycle failures
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// Remote store call failed during a reconciliation run
    #[error("{operation} config error: group[{}] dataID[{}]; {source}", .key.group, .key.id)]
    Resolution {
        operation: Operation,
        key: ConfigKey,
        #[source]
        source: StoreError,
    },

    /// Publish attempted while running against a static snapshot
    #[error("config is offline mode")]
    Offline,

    /// Remote store error surfaced unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Spawned reconciliation task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Background(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("cannot find handler by name:{name}")]
    UnknownHandler { name: String },

    #[error("mirror has not been initialized")]
    NotInitialized,

    #[error("mirror is already initialized")]
    AlreadyInitialized,
}

/// Remote store primitive that failed during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Search,
    Listen,
}

impl std::fmt::Display for Operation {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Operation::Fetch => write!(f, "get"),
            Operation::Search => write!(f, "search"),
            Operation::Listen => write!(f, "listen"),
        }
    }
}

impl Error {
    pub(crate) fn resolution(
        operation: Operation,
        key: &ConfigKey,
        source: StoreError,
    ) -> Self {
        Error::Resolution {
            operation,
            key: key.clone(),
            source,
        }
    }
}
