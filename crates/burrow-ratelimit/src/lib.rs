//! Fixed-window rate limiting backed by a shared counter store.

pub mod error;
pub mod limiter;
pub mod store;

pub use error::CounterError;
pub use limiter::{FailurePolicy, FixedWindowRateLimiter, RateLimiter, COUNTER_TTL, WINDOW};
pub use store::{CounterStore, InMemoryCounterStore, RedisCounterStore};
