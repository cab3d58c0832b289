use thiserror::Error;

/// Type alias for counter store results.
pub type Result<T> = std::result::Result<T, CounterError>;

#[derive(Debug, Clone, Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    #[error("counter operation timed out: {0}")]
    Timeout(String),
    #[error("counter operation failed: {0}")]
    Operation(String),
}
