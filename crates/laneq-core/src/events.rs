use tokio::sync::broadcast;

use crate::item::QueueItem;

/// Notifications published by `DelayedQueue` after each state change.
///
/// Delivery is best effort: events are dropped when nobody is subscribed,
/// and slow subscribers observe `RecvError::Lagged`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued { item: QueueItem },
    Dequeued { item: QueueItem },
    /// The earliest timestamp in `lane` was popped but is not due yet and
    /// has been put back.
    NotDue { lane: String, due_at: u64 },
    /// `clear` deleted `keys` keys.
    Cleared { keys: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: QueueEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}
