pub mod error;
pub mod nanoid;
pub mod random;

pub use error::GeneratorError;
pub use nanoid::NanoIdGenerator;
pub use random::{OsRandom, RandomSource, SeededRandom};

use burrow_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage;
/// uniqueness is settled by the repository at insert time.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Generates a code of exactly `length` characters.
    fn generate(&self, length: usize) -> Result<ShortCode, GeneratorError>;
}

impl<G: CodeGenerator + ?Sized> CodeGenerator for std::sync::Arc<G> {
    fn generate(&self, length: usize) -> Result<ShortCode, GeneratorError> {
        (**self).generate(length)
    }
}
