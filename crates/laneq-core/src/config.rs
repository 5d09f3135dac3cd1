use std::path::Path;

use serde::Deserialize;

use crate::error::{QueueError, Result};
use crate::storage::KeySpace;

/// Top-level configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneqConfig {
    pub queue: QueueConfig,
    pub redis: RedisConfig,
}

/// Queue configuration (key prefix, event channel sizing).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Prefix for every key the queue writes. Queues sharing a store but
    /// using different identifiers never see each other's items.
    pub identifier: String,
    pub event_channel_capacity: usize,
}

/// Redis connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            identifier: KeySpace::DEFAULT_IDENTIFIER.to_string(),
            event_channel_capacity: 1024,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl QueueConfig {
    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.identifier.is_empty() {
            return Err(QueueError::InvalidConfig(
                "queue.identifier must not be empty".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(QueueError::InvalidConfig(
                "queue.event_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl LaneqConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| QueueError::InvalidConfig(e.to_string()))?;
        config.queue.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            QueueError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }
}
