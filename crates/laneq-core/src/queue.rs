use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{LaneqConfig, QueueConfig};
use crate::duration::parse_duration;
use crate::error::Result;
use crate::events::{EventBus, QueueEvent};
use crate::item::QueueItem;
use crate::storage::keys::timestamp_member;
use crate::storage::{KeySpace, RedisStore, Store, WriteBatchOp};

/// When an enqueued item becomes eligible for dequeue.
///
/// `wait` takes precedence over `at`. With neither set the item is due
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Relative delay such as `"1 seconds"` or `"5m"`.
    pub wait: Option<String>,
    /// Absolute instant.
    pub at: Option<SystemTime>,
}

impl EnqueueOptions {
    pub fn wait(wait: impl Into<String>) -> Self {
        Self {
            wait: Some(wait.into()),
            at: None,
        }
    }

    pub fn at(at: SystemTime) -> Self {
        Self {
            wait: None,
            at: Some(at),
        }
    }
}

/// Read-only snapshot of one lane's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneStats {
    /// Distinct due timestamps currently scheduled. Items sharing a
    /// timestamp count once.
    pub scheduled_timestamps: u64,
    /// Earliest scheduled due timestamp (ms since epoch).
    pub next_due: Option<u64>,
}

/// A multi-lane delayed queue whose entire state lives in a `Store`.
///
/// Per lane the store holds a sorted set of due timestamps, one FIFO list of
/// item ids per timestamp, and one serialized record per item. The queue
/// itself keeps no mutable state, so any number of producers and consumers
/// may share a store.
pub struct DelayedQueue {
    store: Arc<dyn Store>,
    keys: KeySpace,
    owns_store: bool,
    events: EventBus,
}

impl DelayedQueue {
    /// Build a queue over an externally managed store. `connect` and
    /// `disconnect` leave that store's lifecycle alone.
    pub fn new(store: Arc<dyn Store>, config: QueueConfig) -> Result<Self> {
        Self::build(store, &config, false)
    }

    /// Build a queue that owns a Redis store created from `config.redis.url`.
    /// Call `connect` before use.
    pub fn open(config: &LaneqConfig) -> Result<Self> {
        let store = Arc::new(RedisStore::new(&config.redis.url)?);
        Self::build(store, &config.queue, true)
    }

    fn build(store: Arc<dyn Store>, config: &QueueConfig, owns_store: bool) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            keys: KeySpace::new(config.identifier.clone()),
            owns_store,
            events: EventBus::new(config.event_channel_capacity),
        })
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Receive a `QueueEvent` for every subsequent state change.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub async fn connect(&self) -> Result<()> {
        if self.owns_store {
            self.store.connect().await?;
        }
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        if self.owns_store {
            self.store.disconnect().await?;
        }
        Ok(())
    }

    /// Delete every key under this queue's identifier prefix and return how
    /// many were removed.
    ///
    /// Not atomic across keys; meant for setup and teardown, not for use
    /// while producers or consumers are active.
    #[tracing::instrument(skip_all, fields(identifier = %self.keys.identifier()))]
    pub async fn clear(&self) -> Result<usize> {
        let keys = self.store.keys(&self.keys.clear_pattern()).await?;
        self.store.del(&keys).await?;
        info!(count = keys.len(), "cleared queue state");
        self.events.publish(QueueEvent::Cleared { keys: keys.len() });
        Ok(keys.len())
    }

    /// Schedule `payload` in `lane` and return the stored record.
    ///
    /// The schedule entry, the bucket append, and the item record are written
    /// in one atomic batch.
    #[tracing::instrument(skip_all, fields(lane = %lane))]
    pub async fn enqueue(
        &self,
        payload: serde_json::Value,
        lane: &str,
        options: EnqueueOptions,
    ) -> Result<QueueItem> {
        let now = now_ms();
        let dequeue_after = match (options.wait.as_deref(), options.at) {
            (Some(wait), _) => {
                let delay = parse_duration(wait)?;
                now.saturating_add(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
            }
            (None, Some(at)) => epoch_ms(at),
            (None, None) => now,
        };

        let item = QueueItem {
            id: QueueItem::new_id(),
            lane: lane.to_string(),
            payload,
            enqueued_at: now,
            dequeue_after,
        };
        let member = timestamp_member(dequeue_after);

        self.store
            .write_batch(vec![
                WriteBatchOp::ZAdd {
                    key: self.keys.schedule_key(lane),
                    member: member.clone(),
                    score: dequeue_after as f64,
                },
                WriteBatchOp::RPush {
                    key: self.keys.bucket_key(lane, &member),
                    value: item.id.clone(),
                },
                WriteBatchOp::Set {
                    key: self.keys.item_key(&item.id),
                    value: item.to_json()?,
                },
            ])
            .await?;

        debug!(id = %item.id, dequeue_after, "item enqueued");
        self.events.publish(QueueEvent::Enqueued { item: item.clone() });
        Ok(item)
    }

    /// Remove and return the earliest due item in `lane`, or `None` when
    /// nothing is due yet.
    ///
    /// This is a sequence of single-command store calls rather than one
    /// transaction. The earliest timestamp is popped first, which claims it
    /// against concurrent callers; it is put back if it is not due yet or if
    /// its bucket still holds ids after this call takes one.
    #[tracing::instrument(skip_all, fields(lane = %lane))]
    pub async fn dequeue(&self, lane: &str) -> Result<Option<QueueItem>> {
        let schedule_key = self.keys.schedule_key(lane);
        let Some(entry) = self.store.zpop_min(&schedule_key).await? else {
            return Ok(None);
        };

        let now = now_ms();
        if entry.score >= now as f64 {
            self.store
                .zadd(&schedule_key, &entry.member, entry.score)
                .await?;
            debug!(due_at = %entry.member, now, "earliest timestamp not due yet");
            self.events.publish(QueueEvent::NotDue {
                lane: lane.to_string(),
                due_at: entry.score as u64,
            });
            return Ok(None);
        }

        let bucket_key = self.keys.bucket_key(lane, &entry.member);
        let Some(id) = self.store.lpop(&bucket_key).await? else {
            // The timestamp is dropped from the schedule: it has no ids left.
            warn!(timestamp = %entry.member, "scheduled timestamp has an empty bucket");
            return Ok(None);
        };

        let item_key = self.keys.item_key(&id);
        let serialized = self.store.get(&item_key).await?;
        self.store.del(std::slice::from_ref(&item_key)).await?;

        if self.store.llen(&bucket_key).await? > 0 {
            self.store
                .zadd(&schedule_key, &entry.member, entry.score)
                .await?;
        }

        let Some(serialized) = serialized else {
            warn!(%id, "bucket referenced an item with no stored record");
            return Ok(None);
        };
        let item = QueueItem::from_json(&serialized)?;

        debug!(id = %item.id, dequeue_after = item.dequeue_after, "item dequeued");
        self.events.publish(QueueEvent::Dequeued { item: item.clone() });
        Ok(Some(item))
    }

    /// Count the distinct timestamps scheduled in `lane` and report the
    /// earliest one. Does not modify the queue.
    #[tracing::instrument(skip_all, fields(lane = %lane))]
    pub async fn lane_stats(&self, lane: &str) -> Result<LaneStats> {
        let schedule_key = self.keys.schedule_key(lane);
        let scheduled_timestamps = self.store.zcard(&schedule_key).await?;
        let next_due = self
            .store
            .zpeek_min(&schedule_key)
            .await?
            .map(|entry| entry.score as u64);
        debug!(scheduled_timestamps, ?next_due, "lane stats");
        Ok(LaneStats {
            scheduled_timestamps,
            next_due,
        })
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    epoch_ms(SystemTime::now())
}

/// Milliseconds since the Unix epoch; instants before the epoch clamp to 0.
fn epoch_ms(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
