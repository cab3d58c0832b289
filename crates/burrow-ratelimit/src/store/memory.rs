use crate::error::{CounterError, Result};
use crate::store::CounterStore;
use async_trait::async_trait;
use burrow_core::{Clock, SystemClock};
use dashmap::DashMap;
use jiff::{SignedDuration, Timestamp};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
struct Counter {
    value: u64,
    expires_at: Option<Timestamp>,
}

impl Counter {
    fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// In-memory counter store for single-node deployments and tests.
///
/// Increments hold the shard lock of their key for the whole
/// read-modify-write, so concurrent callers never observe the same value.
/// Expired counters are reset lazily on the next increment.
#[derive(Clone)]
pub struct InMemoryCounterStore {
    counters: Arc<DashMap<String, Counter>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Current value of a live counter.
    pub fn get(&self, key: &str) -> Option<u64> {
        let now = self.clock.now();
        self.counters
            .get(key)
            .filter(|counter| !counter.is_expired_at(now))
            .map(|counter| counter.value)
    }

    /// Drops every expired counter and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired_at(now));
        before - self.counters.len()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCounterStore")
            .field("counters", &self.counters.len())
            .finish()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        let now = self.clock.now();
        let mut counter = self.counters.entry(key.to_owned()).or_default();
        if counter.is_expired_at(now) {
            *counter = Counter::default();
        }
        counter.value = counter.value.saturating_add(1);
        Ok(counter.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let ttl = SignedDuration::try_from(ttl)
            .map_err(|e| CounterError::Operation(format!("invalid ttl: {e}")))?;
        let expires_at = self
            .clock
            .now()
            .checked_add(ttl)
            .map_err(|e| CounterError::Operation(format!("invalid ttl: {e}")))?;

        if let Some(mut counter) = self.counters.get_mut(key) {
            counter.expires_at = Some(expires_at);
        }
        Ok(())
    }
}
