//! Pub/sub backends
//!
//! - `MemoryBroker`: in-process broker, used for tests and single-process runs
//! - `RedisConnector`: Redis pub/sub (feature `redis`)

mod memory;
#[cfg(feature = "redis")]
mod redis_pubsub;

pub use memory::{MemoryBroker, MemoryPubSub};
#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisConfig, RedisConnector, RedisPubSub};
