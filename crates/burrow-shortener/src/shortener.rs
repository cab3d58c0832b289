use crate::error::Result;
use async_trait::async_trait;
use burrow_core::{ShortCode, UrlRecord};

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Issues a new short code for `long_url` and returns the persisted record.
    ///
    /// The URL is stored as given; validating it is the caller's job.
    async fn create(&self, long_url: &str) -> Result<UrlRecord>;

    /// Resolves a short code to its long URL.
    ///
    /// Unknown and expired codes both resolve to `None`.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<String>>;
}
