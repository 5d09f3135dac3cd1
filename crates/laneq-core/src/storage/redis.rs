use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::storage::traits::{ScheduleEntry, Store, WriteBatchOp};

/// Redis-backed store implementation.
///
/// Owns its connection lifecycle: `connect` opens a `ConnectionManager`
/// (which reconnects on its own after transient failures) and `disconnect`
/// drops it. Primitives called while disconnected fail with
/// `StoreError::NotConnected`.
pub struct RedisStore {
    client: redis::Client,
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Build a store for `url` without opening a connection yet.
    pub fn new(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            conn: RwLock::new(None),
        })
    }

    /// Build a store and connect it immediately.
    pub async fn open(url: &str) -> StoreResult<Self> {
        let store = Self::new(url)?;
        store.connect().await?;
        Ok(store)
    }

    pub fn is_connected(&self) -> bool {
        self.conn.read().is_some()
    }

    fn conn(&self) -> StoreResult<ConnectionManager> {
        self.conn.read().clone().ok_or(StoreError::NotConnected)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn connect(&self) -> StoreResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let manager = self.client.get_connection_manager().await?;
        *self.conn.write() = Some(manager);
        info!("redis store connected");
        Ok(())
    }

    async fn disconnect(&self) -> StoreResult<()> {
        if self.conn.write().take().is_some() {
            info!("redis store disconnected");
        }
        Ok(())
    }

    async fn zpop_min(&self, key: &str) -> StoreResult<Option<ScheduleEntry>> {
        let mut conn = self.conn()?;
        let popped: Vec<(String, f64)> = conn.zpopmin(key, 1).await?;
        Ok(popped
            .into_iter()
            .next()
            .map(|(member, score)| ScheduleEntry { member, score }))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn()?;
        Ok(conn.zcard(key).await?)
    }

    async fn zpeek_min(&self, key: &str) -> StoreResult<Option<ScheduleEntry>> {
        let mut conn = self.conn()?;
        let head: Vec<(String, f64)> = conn.zrange_withscores(key, 0, 0).await?;
        Ok(head
            .into_iter()
            .next()
            .map(|(member, score)| ScheduleEntry { member, score }))
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn()?;
        Ok(conn.lpop(key, None).await?)
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn()?;
        Ok(conn.llen(key).await?)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn()?;
        Ok(conn.get(key).await?)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn()?;
        Ok(conn.keys(pattern).await?)
    }

    async fn write_batch(&self, ops: Vec<WriteBatchOp>) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in &ops {
            match op {
                WriteBatchOp::ZAdd { key, member, score } => {
                    pipe.zadd(key, member, *score).ignore();
                }
                WriteBatchOp::RPush { key, value } => {
                    pipe.rpush(key, value).ignore();
                }
                WriteBatchOp::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
            }
        }

        let _: () = pipe.query_async(&mut conn).await?;
        debug!(ops = ops.len(), "write batch applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_does_not_connect() {
        let store = RedisStore::new("redis://127.0.0.1:6379").unwrap();
        assert!(!store.is_connected());
    }

    #[test]
    fn new_rejects_malformed_url() {
        let err = RedisStore::new("not a url").err().unwrap();
        assert!(
            matches!(err, StoreError::Redis(_)),
            "expected Redis error, got {err:?}"
        );
    }

    #[tokio::test]
    async fn primitives_fail_when_disconnected() {
        let store = RedisStore::new("redis://127.0.0.1:6379").unwrap();
        let err = store.zpop_min("k").await.unwrap_err();
        assert!(
            matches!(err, StoreError::NotConnected),
            "expected NotConnected, got {err:?}"
        );
        let err = store.write_batch(vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_a_no_op() {
        let store = RedisStore::new("redis://127.0.0.1:6379").unwrap();
        store.disconnect().await.unwrap();
        assert!(!store.is_connected());
    }
}
