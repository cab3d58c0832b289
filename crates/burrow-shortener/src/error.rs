use burrow_core::StorageError;
use burrow_generator::GeneratorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The freshly generated code is already taken.
    #[error("alias already exists: {0}")]
    AliasExists(String),
    #[error("code generation failed: {0}")]
    Generation(#[from] GeneratorError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
