use crate::error::{CounterError, Result};
use crate::store::CounterStore;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{trace, warn};

/// A Redis-based implementation of [`CounterStore`].
///
/// Increments use `INCR`, which is atomic on the server, so concurrent
/// limiter instances sharing one Redis agree on every count.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: redis::aio::MultiplexedConnection,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CounterError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CounterError::Timeout(message)
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        CounterError::Unavailable(message)
    } else {
        CounterError::Operation(message)
    }
}

impl RedisCounterStore {
    /// Creates a new Redis counter store.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        trace!(key, "Incrementing counter in Redis");

        let mut conn = self.conn.clone();
        conn.incr::<_, _, u64>(key, 1_u64).await.map_err(|e| {
            warn!(key, error = %e, "Redis error on incr");
            map_redis_error("failed to increment counter in Redis", e)
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        trace!(key, ttl_secs = ttl.as_secs(), "Setting counter expiry in Redis");

        let seconds = i64::try_from(ttl.as_secs())
            .map_err(|e| CounterError::Operation(format!("invalid ttl: {e}")))?;
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(key, seconds).await.map_err(|e| {
            warn!(key, error = %e, "Redis error on expire");
            map_redis_error("failed to set counter expiry in Redis", e)
        })
    }
}
