pub mod memory;
pub mod redis;

pub use self::memory::InMemoryCounterStore;
pub use self::redis::RedisCounterStore;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A shared store of expiring integer counters.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Atomically increments the counter and returns the new value.
    ///
    /// A missing or expired counter starts again from zero, so the first
    /// caller observes `1`.
    async fn increment(&self, key: &str) -> Result<u64>;

    /// Sets the counter to expire `ttl` from now.
    /// It is not an error if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}
