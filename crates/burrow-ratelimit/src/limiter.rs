use crate::store::CounterStore;
use async_trait::async_trait;
use burrow_core::{Clock, SystemClock};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Length of one rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Lifetime of a window counter, set by its first writer.
///
/// Two windows, so a counter outlives its window under clock skew between
/// limiter instances.
pub const COUNTER_TTL: Duration = Duration::from_secs(120);

/// Attempts at setting a new counter's expiry. A counter whose expiry was
/// never set lives until it is deleted by hand.
const EXPIRE_ATTEMPTS: usize = 3;

const KEY_PREFIX: &str = "rate:";

/// What the limiter answers when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Deny every request until the store recovers.
    #[default]
    FailClosed,
    /// Admit every request until the store recovers.
    FailOpen,
}

impl FailurePolicy {
    fn admits(self) -> bool {
        matches!(self, FailurePolicy::FailOpen)
    }
}

impl Display for FailurePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::FailClosed => write!(f, "fail-closed"),
            FailurePolicy::FailOpen => write!(f, "fail-open"),
        }
    }
}

#[async_trait]
pub trait RateLimiter: Send + Sync + 'static {
    /// Counts one request against `key` and reports whether it is admitted.
    async fn allow(&self, key: &str, max_per_window: u64) -> bool;
}

/// A fixed-window rate limiter.
///
/// Windows are aligned to the clock (`epoch_seconds / 60`), so a client may
/// send up to twice the ceiling across a window boundary. State is one
/// counter per key per window.
pub struct FixedWindowRateLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: FailurePolicy,
}

impl<S: CounterStore> FixedWindowRateLimiter<S> {
    pub fn new(store: S, policy: FailurePolicy) -> Self {
        Self::with_clock(store, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, policy: FailurePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Index of the window containing the current time.
    pub fn window_index(&self) -> i64 {
        self.clock
            .now()
            .as_second()
            .div_euclid(WINDOW.as_secs() as i64)
    }

    /// Counter key for `key` in the given window.
    pub fn window_key(&self, key: &str, window_index: i64) -> String {
        format!("{KEY_PREFIX}{key}:{window_index}")
    }
}

impl<S: CounterStore> FixedWindowRateLimiter<S> {
    async fn set_expiry(&self, counter_key: &str) {
        for attempt in 1..=EXPIRE_ATTEMPTS {
            match self.store.expire(counter_key, COUNTER_TTL).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(key = %counter_key, attempt, error = %e, "failed to set rate counter expiry");
                }
            }
        }
    }
}

impl<S> std::fmt::Debug for FixedWindowRateLimiter<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: CounterStore> RateLimiter for FixedWindowRateLimiter<S> {
    async fn allow(&self, key: &str, max_per_window: u64) -> bool {
        let counter_key = self.window_key(key, self.window_index());
        trace!(key = %counter_key, "checking rate limit");

        let count = match self.store.increment(&counter_key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    key = %counter_key,
                    error = %e,
                    policy = %self.policy,
                    "counter store unavailable, applying failure policy"
                );
                return self.policy.admits();
            }
        };

        // Only the caller that created the counter sets its expiry.
        if count == 1 {
            self.set_expiry(&counter_key).await;
        }

        let allowed = count <= max_per_window;
        if !allowed {
            debug!(key = %counter_key, count, max_per_window, "rate limit exceeded");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CounterError, Result};
    use crate::store::InMemoryCounterStore;
    use burrow_core::ManualClock;
    use jiff::{SignedDuration, Timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limiter_at(
        second: i64,
    ) -> (FixedWindowRateLimiter<InMemoryCounterStore>, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_second(second).unwrap());
        let store = InMemoryCounterStore::with_clock(Arc::new(clock.clone()));
        let limiter =
            FixedWindowRateLimiter::with_clock(store, FailurePolicy::default(), Arc::new(clock.clone()));
        (limiter, clock)
    }

    struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        async fn increment(&self, _key: &str) -> Result<u64> {
            Err(CounterError::Unavailable("connection refused".to_string()))
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<()> {
            Err(CounterError::Unavailable("connection refused".to_string()))
        }
    }

    /// Counts how often the expiry is set, failing the first
    /// `failing_expires` attempts.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryCounterStore,
        expire_calls: AtomicUsize,
        failing_expires: usize,
    }

    impl CountingStore {
        fn failing(failing_expires: usize) -> Self {
            Self {
                failing_expires,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl CounterStore for CountingStore {
        async fn increment(&self, key: &str) -> Result<u64> {
            self.inner.increment(key).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
            let call = self.expire_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failing_expires {
                return Err(CounterError::Timeout("expire timed out".to_string()));
            }
            self.inner.expire(key, ttl).await
        }
    }

    #[tokio::test]
    async fn admits_exactly_ceiling_per_window() {
        let (limiter, _clock) = limiter_at(600);

        for _ in 0..5 {
            assert!(limiter.allow("create:10.0.0.1", 5).await);
        }
        assert!(!limiter.allow("create:10.0.0.1", 5).await);
        assert!(!limiter.allow("create:10.0.0.1", 5).await);
    }

    #[tokio::test]
    async fn next_window_resets_count() {
        let (limiter, clock) = limiter_at(600);

        for _ in 0..3 {
            assert!(limiter.allow("k", 3).await);
        }
        assert!(!limiter.allow("k", 3).await);

        clock.advance(SignedDuration::from_secs(60));
        assert!(limiter.allow("k", 3).await);
    }

    #[tokio::test]
    async fn windows_are_clock_aligned() {
        // 59 seconds into a window: one more second starts the next one.
        let (limiter, clock) = limiter_at(659);
        assert!(limiter.allow("k", 1).await);
        assert!(!limiter.allow("k", 1).await);

        clock.advance(SignedDuration::from_secs(1));
        assert!(limiter.allow("k", 1).await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let (limiter, _clock) = limiter_at(0);
        assert!(limiter.allow("a", 1).await);
        assert!(!limiter.allow("a", 1).await);
        assert!(limiter.allow("b", 1).await);
    }

    #[tokio::test]
    async fn window_key_format() {
        let (limiter, _clock) = limiter_at(125);
        assert_eq!(limiter.window_index(), 2);
        assert_eq!(limiter.window_key("create:1.2.3.4", 2), "rate:create:1.2.3.4:2");
    }

    #[tokio::test]
    async fn counter_expires_after_two_windows() {
        let (limiter, clock) = limiter_at(0);
        limiter.allow("k", 10).await;
        let key = limiter.window_key("k", 0);
        assert_eq!(limiter.store().get(&key), Some(1));

        clock.advance(SignedDuration::from_secs(119));
        assert_eq!(limiter.store().get(&key), Some(1));

        clock.advance(SignedDuration::from_secs(1));
        assert_eq!(limiter.store().get(&key), None);
    }

    #[tokio::test]
    async fn expiry_set_once_per_window() {
        let limiter = FixedWindowRateLimiter::new(CountingStore::default(), FailurePolicy::FailClosed);
        for _ in 0..10 {
            limiter.allow("k", 100).await;
        }
        assert_eq!(limiter.store().expire_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_expiry_is_retried() {
        let limiter = FixedWindowRateLimiter::new(CountingStore::failing(1), FailurePolicy::FailClosed);
        assert!(limiter.allow("k", 100).await);
        // Second attempt succeeded, so no third.
        assert_eq!(limiter.store().expire_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expiry_retries_are_bounded() {
        let limiter = FixedWindowRateLimiter::new(CountingStore::failing(10), FailurePolicy::FailClosed);
        assert!(limiter.allow("k", 100).await);
        assert_eq!(
            limiter.store().expire_calls.load(Ordering::SeqCst),
            EXPIRE_ATTEMPTS
        );
    }

    #[tokio::test]
    async fn concurrent_callers_never_exceed_ceiling() {
        let (limiter, _clock) = limiter_at(0);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.allow("burst", 10).await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn fail_closed_denies_when_store_down() {
        let limiter = FixedWindowRateLimiter::new(DownStore, FailurePolicy::FailClosed);
        assert!(!limiter.allow("k", 100).await);
    }

    #[tokio::test]
    async fn fail_open_admits_when_store_down() {
        let limiter = FixedWindowRateLimiter::new(DownStore, FailurePolicy::FailOpen);
        assert!(limiter.allow("k", 100).await);
    }
}
