use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("code length must be positive")]
    InvalidLength,
    #[error("randomness source unavailable: {0}")]
    RandomnessUnavailable(String),
}
