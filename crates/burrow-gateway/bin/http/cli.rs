use burrow_ratelimit::FailurePolicy;
use burrow_shortener::MAX_CODE_LENGTH;
use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "BURROW_GATEWAY_LISTEN_ADDR";
pub const CODE_LENGTH_ENV: &str = "BURROW_CODE_LENGTH";
pub const DEFAULT_TTL_SECONDS_ENV: &str = "BURROW_DEFAULT_TTL_SECONDS";
pub const RATE_LIMIT_PER_MINUTE_ENV: &str = "BURROW_RATE_LIMIT_PER_MINUTE";
pub const RATE_LIMIT_FAILURE_POLICY_ENV: &str = "BURROW_RATE_LIMIT_FAILURE_POLICY";
pub const STORAGE_BACKEND_ENV: &str = "BURROW_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "BURROW_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "BURROW_CACHE_BACKEND";
pub const CACHE_CAPACITY_ENV: &str = "BURROW_CACHE_CAPACITY";
pub const REDIS_URL_ENV: &str = "BURROW_REDIS_URL";
pub const COUNTER_BACKEND_ENV: &str = "BURROW_COUNTER_BACKEND";
pub const REQUEST_TIMEOUT_MS_ENV: &str = "BURROW_REQUEST_TIMEOUT_MS";
pub const HIT_QUEUE_CAPACITY_ENV: &str = "BURROW_HIT_QUEUE_CAPACITY";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CounterBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for CounterBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterBackendArg::InMemory => write!(f, "in-memory"),
            CounterBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicyArg {
    #[value(name = "fail-closed")]
    FailClosed,
    #[value(name = "fail-open")]
    FailOpen,
}

impl From<FailurePolicyArg> for FailurePolicy {
    fn from(value: FailurePolicyArg) -> Self {
        match value {
            FailurePolicyArg::FailClosed => FailurePolicy::FailClosed,
            FailurePolicyArg::FailOpen => FailurePolicy::FailOpen,
        }
    }
}

impl Display for FailurePolicyArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&FailurePolicy::from(*self), f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "burrow-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = 7,
        value_parser = clap::value_parser!(u16).range(1..=MAX_CODE_LENGTH as i64),
    )]
    pub code_length: u16,

    /// Lifetime of new short URLs; 0 keeps them forever.
    #[arg(long, env = DEFAULT_TTL_SECONDS_ENV, default_value_t = 0)]
    pub default_ttl_seconds: u64,

    #[arg(
        long,
        env = RATE_LIMIT_PER_MINUTE_ENV,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub rate_limit_per_minute: u64,

    #[arg(
        long,
        env = RATE_LIMIT_FAILURE_POLICY_ENV,
        value_enum,
        default_value_t = FailurePolicyArg::FailClosed
    )]
    pub rate_limit_failure_policy: FailurePolicyArg,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    /// Maximum entries held by the in-process cache.
    #[arg(
        long,
        env = CACHE_CAPACITY_ENV,
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub cache_capacity: u64,

    #[arg(
        long,
        env = REDIS_URL_ENV,
        required_if_eq_any([("cache", "redis"), ("counter_store", "redis")])
    )]
    pub redis_url: Option<String>,

    #[arg(
        long,
        env = COUNTER_BACKEND_ENV,
        value_enum,
        default_value_t = CounterBackendArg::InMemory
    )]
    pub counter_store: CounterBackendArg,

    #[arg(long, env = REQUEST_TIMEOUT_MS_ENV, default_value_t = 5000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = HIT_QUEUE_CAPACITY_ENV, default_value_t = 1024)]
    pub hit_queue_capacity: usize,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,
}

impl CLI {
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_seconds > 0).then(|| Duration::from_secs(self.default_ttl_seconds))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn needs_redis(&self) -> bool {
        self.cache == CacheBackendArg::Redis || self.counter_store == CounterBackendArg::Redis
    }
}
