use crate::GeneratorError;
use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng, TryRngCore};

/// A source of random bytes for code generation.
pub trait RandomSource: Send + Sync + 'static {
    /// Fills `dest` entirely or fails; partial output is never used.
    fn fill(&self, dest: &mut [u8]) -> Result<(), GeneratorError>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), GeneratorError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| GeneratorError::RandomnessUnavailable(e.to_string()))
    }
}

/// A deterministic source seeded from a `u64`.
///
/// Not suitable for production codes: the sequence is predictable.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), GeneratorError> {
        self.rng.lock().fill_bytes(dest);
        Ok(())
    }
}
