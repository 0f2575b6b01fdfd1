//! Error types for remote store operations.

/// Result type for remote store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error types for remote store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Key has no value in the store
    #[error("config not found")]
    NotFound,

    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,

    /// Transport failure between the client and the store
    #[error("Network error: {0}")]
    Network(String),

    /// Store rejected or failed the request
    #[error("Server error: {0}")]
    Server(String),

    /// Store is shutting down or the connection is gone
    #[error("Channel closed")]
    Closed,

    /// Change notification queue is at capacity
    #[error("Event queue full")]
    QueueFull,

    /// Malformed request (e.g. invalid page, wildcard in a concrete key)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
