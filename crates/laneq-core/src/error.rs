use crate::duration::DurationError;

/// Low-level store errors (Redis transport, serialization, lifecycle).
/// This is the error type for the `Store` trait: store operations can only
/// fail with infrastructure errors, never queue-level errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store is not connected")]
    NotConnected,
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors surfaced by `DelayedQueue` operations.
///
/// An empty or not-yet-due lane is not an error; `dequeue` reports it as `None`.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    InvalidDuration(#[from] DurationError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, QueueError>;
