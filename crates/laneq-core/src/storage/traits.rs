use async_trait::async_trait;

use crate::error::StoreResult;

/// A single operation in an atomic write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteBatchOp {
    /// Upsert `member` with `score` into the sorted set at `key`.
    ZAdd {
        key: String,
        member: String,
        score: f64,
    },
    /// Append `value` to the tail of the list at `key`.
    RPush { key: String, value: String },
    /// Set the string at `key`.
    Set { key: String, value: String },
}

/// A member popped from or peeked in a sorted set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub member: String,
    pub score: f64,
}

/// The ordered-set, list, and scalar primitives the queue is built on.
///
/// Each method is atomic on its own. Nothing else is: callers that need
/// several writes to land together use `write_batch`. Implementations must
/// be thread-safe.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Lifecycle ---

    /// Open the underlying connection. Stores without one do nothing.
    async fn connect(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Release the underlying connection. Stores without one do nothing.
    async fn disconnect(&self) -> StoreResult<()> {
        Ok(())
    }

    // --- Sorted set operations ---

    /// Atomically remove and return the lowest-scored member.
    async fn zpop_min(&self, key: &str) -> StoreResult<Option<ScheduleEntry>>;

    /// Insert `member` with `score`, or update its score if already present.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Number of members in the sorted set.
    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    /// The lowest-scored member, without removing it.
    async fn zpeek_min(&self, key: &str) -> StoreResult<Option<ScheduleEntry>>;

    // --- List operations ---

    /// Remove and return the head of the list.
    async fn lpop(&self, key: &str) -> StoreResult<Option<String>>;

    /// Length of the list; 0 when the key does not exist.
    async fn llen(&self, key: &str) -> StoreResult<u64>;

    // --- Scalar operations ---

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete every key in `keys`. Missing keys are ignored.
    async fn del(&self, keys: &[String]) -> StoreResult<()>;

    /// List keys matching a glob pattern (`*` and `?`).
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    // --- Batch operations ---

    /// Atomically apply a batch of write operations.
    async fn write_batch(&self, ops: Vec<WriteBatchOp>) -> StoreResult<()>;
}
