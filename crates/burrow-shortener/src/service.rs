use crate::config::ShortenerConfig;
use crate::error::{Result, ShortenerError};
use crate::hits::HitTracker;
use crate::shortener::Shortener;
use async_trait::async_trait;
use burrow_core::{
    Clock, ShortCode, StorageError, SystemClock, UrlCache, UrlRecord, UrlRepository,
};
use burrow_generator::CodeGenerator;
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A concrete implementation of the [`Shortener`] trait.
///
/// The repository is the source of truth and the cache only accelerates
/// reads:
/// - `create` checks the generated code against the repository, persists the
///   record (retrying once with a longer code if the insert loses a race) and
///   then primes the cache.
/// - `resolve` is cache-aside. Misses fall back to the repository, expired
///   records are hidden, and live ones are written back with their remaining
///   lifetime as TTL, so a cache entry never outlives its record.
///
/// Every successful resolution queues a hit on the [`HitTracker`].
pub struct UrlShorteningService<R, C, G> {
    repository: Arc<R>,
    cache: Arc<C>,
    generator: G,
    clock: Arc<dyn Clock>,
    hits: HitTracker,
    config: ShortenerConfig,
}

impl<R, C, G> UrlShorteningService<R, C, G>
where
    R: UrlRepository,
    C: UrlCache,
    G: CodeGenerator,
{
    /// Creates the service and starts its hit worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(repository: Arc<R>, cache: Arc<C>, generator: G, config: ShortenerConfig) -> Self {
        Self::with_clock(repository, cache, generator, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        cache: Arc<C>,
        generator: G,
        config: ShortenerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hits = HitTracker::spawn(repository.clone(), config.hit_queue_capacity);
        Self {
            repository,
            cache,
            generator,
            clock,
            hits,
            config,
        }
    }

    pub fn config(&self) -> &ShortenerConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Writes `record` into the cache with its remaining lifetime.
    ///
    /// Failures are logged only; the repository already holds the record.
    async fn populate_cache(&self, record: &UrlRecord, now: Timestamp) {
        let ttl = record.remaining_ttl(now);
        if ttl.is_some_and(|ttl| ttl.as_millis() == 0) {
            trace!(code = %record.code, "record about to expire, not caching");
            return;
        }

        if let Err(e) = self
            .cache
            .set_url(&record.code, &record.long_url, ttl)
            .await
        {
            warn!(code = %record.code, error = %e, "failed to populate cache");
        }
    }
}

impl<R, C, G> std::fmt::Debug for UrlShorteningService<R, C, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlShorteningService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<R, C, G> Shortener for UrlShorteningService<R, C, G>
where
    R: UrlRepository,
    C: UrlCache,
    G: CodeGenerator,
{
    async fn create(&self, long_url: &str) -> Result<UrlRecord> {
        let length = self.config.effective_code_length();
        let code = self.generator.generate(length)?;
        trace!(code = %code, "generated short code");

        if self.repository.exists_by_code(&code).await? {
            debug!(code = %code, "generated code is already taken");
            return Err(ShortenerError::AliasExists(code.to_string()));
        }

        let record = UrlRecord::new(code, long_url, self.clock.now(), self.config.default_ttl)?;

        let saved = match self.repository.save(record.clone()).await {
            Ok(saved) => saved,
            Err(StorageError::Conflict(taken)) => {
                // Lost an insert race. One retry, one character longer.
                let code = self.generator.generate(length + 1)?;
                debug!(taken = %taken, code = %code, "code claimed concurrently, retrying");
                self.repository.save(UrlRecord { code, ..record }).await?
            }
            Err(e) => return Err(e.into()),
        };

        // The save may have taken a while; measure what is left from now.
        self.populate_cache(&saved, self.clock.now()).await;
        debug!(code = %saved.code, "created short url");
        Ok(saved)
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "resolving short code");

        match self.cache.get_url(code).await {
            Ok(Some(long_url)) => {
                debug!(code = %code, "cache hit");
                self.hits.record(code);
                return Ok(Some(long_url));
            }
            Ok(None) => debug!(code = %code, "cache miss"),
            Err(e) => {
                warn!(code = %code, error = %e, "cache read failed, falling back to repository");
            }
        }

        let Some(record) = self.repository.find_by_code(code).await? else {
            trace!(code = %code, "short code not found");
            return Ok(None);
        };

        let now = self.clock.now();
        if record.is_expired_at(now) {
            debug!(code = %code, "record has expired");
            return Ok(None);
        }

        self.populate_cache(&record, now).await;
        self.hits.record(code);
        Ok(Some(record.long_url))
    }
}
