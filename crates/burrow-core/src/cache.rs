use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key prefix for cached code → URL mappings.
pub const KEY_PREFIX: &str = "url:";

/// Returns the cache key for a short code.
pub fn cache_key(code: &ShortCode) -> String {
    format!("{}{}", KEY_PREFIX, code.as_str())
}

/// An expiring cache of short code → long URL mappings.
///
/// The cache accelerates resolution but is never the source of truth:
/// entries may be missing, evicted, or dropped at any time.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get the long URL for a code.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store the long URL for a code.
    ///
    /// If `ttl` is `None`, the entry does not expire on its own.
    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Option<Duration>)
        -> Result<()>;
}
