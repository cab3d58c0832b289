mod cli;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use burrow_cache::{MokaUrlCache, RedisUrlCache};
use burrow_core::{UrlCache, UrlRepository};
use burrow_gateway::{App, AppState};
use burrow_generator::NanoIdGenerator;
use burrow_ratelimit::{
    FailurePolicy, FixedWindowRateLimiter, InMemoryCounterStore, RateLimiter, RedisCounterStore,
};
use burrow_shortener::{Shortener, ShortenerConfig, UrlShorteningService};
use burrow_storage::{InMemoryRepository, MySqlRepository};
use clap::Parser;
use jiff::Timestamp;
use redis::aio::MultiplexedConnection;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{CacheBackendArg, CounterBackendArg, LogFormatArg, StorageBackendArg, CLI};

/// How often in-process stores drop expired entries.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        cache_capacity = config.cache_capacity,
        counter_backend = %config.counter_store,
        code_length = config.code_length,
        default_ttl_seconds = config.default_ttl_seconds,
        rate_limit_per_minute = config.rate_limit_per_minute,
        rate_limit_failure_policy = %config.rate_limit_failure_policy,
        "starting gateway server"
    );

    let redis = if config.needs_redis() {
        let url = config
            .redis_url
            .as_deref()
            .context("redis url is required for the redis cache or counter store")?;
        Some(connect_redis(url).await?)
    } else {
        None
    };

    let shortener_config = ShortenerConfig::builder()
        .code_length(usize::from(config.code_length))
        .default_ttl(config.default_ttl())
        .hit_queue_capacity(config.hit_queue_capacity)
        .build();

    let shortener = match config.storage {
        StorageBackendArg::InMemory => {
            let repository = Arc::new(InMemoryRepository::new());
            spawn_record_purge(repository.clone());
            build_shortener(repository, &config, redis.clone(), shortener_config)?
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            spawn_mysql_purge(repository.clone());
            build_shortener(
                Arc::new(repository),
                &config,
                redis.clone(),
                shortener_config,
            )?
        }
    };

    let limiter = build_limiter(
        config.counter_store,
        config.rate_limit_failure_policy.into(),
        redis,
    )?;

    let state = AppState::new(shortener, limiter, config.rate_limit_per_minute);
    let router = App::router_with_timeout(state, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn connect_redis(url: &str) -> anyhow::Result<MultiplexedConnection> {
    let client = redis::Client::open(url).context("invalid redis url")?;
    client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to redis")
}

fn build_shortener<R: UrlRepository>(
    repository: Arc<R>,
    cli: &CLI,
    redis: Option<MultiplexedConnection>,
    config: ShortenerConfig,
) -> anyhow::Result<Arc<dyn Shortener>> {
    match cli.cache {
        CacheBackendArg::Moka => Ok(service(
            repository,
            Arc::new(MokaUrlCache::with_capacity(cli.cache_capacity)),
            config,
        )),
        CacheBackendArg::Redis => {
            let conn = redis.context("redis connection is required for the redis cache")?;
            Ok(service(
                repository,
                Arc::new(RedisUrlCache::new(conn)),
                config,
            ))
        }
    }
}

fn service<R: UrlRepository, C: UrlCache>(
    repository: Arc<R>,
    cache: Arc<C>,
    config: ShortenerConfig,
) -> Arc<dyn Shortener> {
    Arc::new(UrlShorteningService::new(
        repository,
        cache,
        NanoIdGenerator::new(),
        config,
    ))
}

fn build_limiter(
    backend: CounterBackendArg,
    policy: FailurePolicy,
    redis: Option<MultiplexedConnection>,
) -> anyhow::Result<Arc<dyn RateLimiter>> {
    match backend {
        CounterBackendArg::InMemory => {
            let store = InMemoryCounterStore::new();
            spawn_counter_purge(store.clone());
            Ok(Arc::new(FixedWindowRateLimiter::new(store, policy)))
        }
        CounterBackendArg::Redis => {
            let conn = redis.context("redis connection is required for the redis counter store")?;
            Ok(Arc::new(FixedWindowRateLimiter::new(
                RedisCounterStore::new(conn),
                policy,
            )))
        }
    }
}

fn spawn_record_purge(repository: Arc<InMemoryRepository>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            repository.purge_expired(Timestamp::now());
        }
    });
}

fn spawn_mysql_purge(repository: MySqlRepository) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = repository.purge_expired(Timestamp::now()).await {
                warn!(error = %e, "failed to purge expired records");
            }
        }
    });
}

fn spawn_counter_purge(store: InMemoryCounterStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            store.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
