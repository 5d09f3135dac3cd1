pub mod config;
pub mod duration;
pub mod error;
pub mod events;
pub mod item;
pub mod queue;
pub mod storage;
pub mod telemetry;

pub use config::{LaneqConfig, QueueConfig, RedisConfig};
pub use duration::{parse_duration, DurationError};
pub use error::{QueueError, Result, StoreError, StoreResult};
pub use events::QueueEvent;
pub use item::QueueItem;
pub use queue::{DelayedQueue, EnqueueOptions, LaneStats};
pub use storage::{KeySpace, MemoryStore, RedisStore, ScheduleEntry, Store, WriteBatchOp};
