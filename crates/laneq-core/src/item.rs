use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreResult;

/// A payload scheduled in a lane. This is also the record stored verbatim
/// in the item store, so the serialized field names are part of the wire
/// contract shared with other implementations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Opaque id. Generated as a UUIDv7 string, but any string read back
    /// from the store is accepted.
    pub id: String,
    #[serde(rename = "queue")]
    pub lane: String,
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub enqueued_at: u64,
    /// Milliseconds since the Unix epoch. The item is not returned by
    /// `dequeue` before this instant.
    pub dequeue_after: u64,
}

impl QueueItem {
    /// Generate a new UUIDv7 item ID.
    pub fn new_id() -> String {
        Uuid::now_v7().to_string()
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
