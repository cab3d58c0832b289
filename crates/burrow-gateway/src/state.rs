use std::sync::Arc;

use burrow_ratelimit::RateLimiter;
use burrow_shortener::Shortener;

/// Rate-limit key prefix for code creation.
pub const CREATE_KEY_PREFIX: &str = "create:";

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    limiter: Arc<dyn RateLimiter>,
    rate_limit_per_minute: u64,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        limiter: Arc<dyn RateLimiter>,
        rate_limit_per_minute: u64,
    ) -> Self {
        Self {
            shortener,
            limiter,
            rate_limit_per_minute,
        }
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    /// Counts one creation attempt for `client` and reports whether it may
    /// proceed.
    pub async fn admit_create(&self, client: &str) -> bool {
        let key = format!("{CREATE_KEY_PREFIX}{client}");
        self.limiter.allow(&key, self.rate_limit_per_minute).await
    }
}
