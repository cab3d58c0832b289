//! Cache adapters for short code → URL mappings.

pub mod moka;
pub mod redis;

pub use self::moka::{CacheConfig, MokaUrlCache};
pub use self::redis::RedisUrlCache;
pub use burrow_core::cache::{cache_key, UrlCache, KEY_PREFIX};
pub use burrow_core::CacheError;
