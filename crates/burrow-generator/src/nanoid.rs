use crate::random::{OsRandom, RandomSource};
use crate::{CodeGenerator, GeneratorError};
use burrow_core::ShortCode;

/// The NanoID URL-safe alphabet.
pub const ALPHABET: &[u8; 64] =
    b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// 64 symbols, so the low six bits of a random byte pick one uniformly.
const MASK: u8 = (ALPHABET.len() - 1) as u8;

/// Random short codes in the NanoID style.
///
/// Each character is drawn independently and uniformly from [`ALPHABET`].
#[derive(Debug, Clone, Default)]
pub struct NanoIdGenerator<S = OsRandom> {
    source: S,
}

impl NanoIdGenerator<OsRandom> {
    /// Creates a generator backed by the operating system's CSPRNG.
    pub fn new() -> Self {
        Self { source: OsRandom }
    }
}

impl<S: RandomSource> NanoIdGenerator<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }
}

impl<S: RandomSource> CodeGenerator for NanoIdGenerator<S> {
    fn generate(&self, length: usize) -> Result<ShortCode, GeneratorError> {
        if length == 0 {
            return Err(GeneratorError::InvalidLength);
        }

        let mut bytes = vec![0u8; length];
        self.source.fill(&mut bytes)?;

        let code: String = bytes
            .iter()
            .map(|b| ALPHABET[(b & MASK) as usize] as char)
            .collect();
        Ok(ShortCode::new_unchecked(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use std::collections::HashSet;

    struct EmptySource;

    impl RandomSource for EmptySource {
        fn fill(&self, _dest: &mut [u8]) -> Result<(), GeneratorError> {
            Err(GeneratorError::RandomnessUnavailable("exhausted".to_string()))
        }
    }

    #[test]
    fn generates_requested_length() {
        let generator = NanoIdGenerator::new();
        for length in [1, 7, 8, 21, 64] {
            assert_eq!(generator.generate(length).unwrap().len(), length);
        }
    }

    #[test]
    fn codes_use_alphabet_only() {
        let generator = NanoIdGenerator::new();
        let code = generator.generate(256).unwrap();
        assert!(code.as_str().bytes().all(|b| ALPHABET.contains(&b)));
        // every generated code passes public validation
        assert!(ShortCode::new(code.as_str()).is_ok());
    }

    #[test]
    fn zero_length_is_rejected() {
        let generator = NanoIdGenerator::new();
        assert_eq!(generator.generate(0), Err(GeneratorError::InvalidLength));
    }

    #[test]
    fn exhausted_source_fails_instead_of_degenerate_code() {
        let generator = NanoIdGenerator::with_source(EmptySource);
        let err = generator.generate(7).unwrap_err();
        assert!(matches!(err, GeneratorError::RandomnessUnavailable(_)));
    }

    #[test]
    fn seeded_generator_is_deterministic() {
        let a = NanoIdGenerator::with_source(SeededRandom::new(42));
        let b = NanoIdGenerator::with_source(SeededRandom::new(42));
        assert_eq!(a.generate(10).unwrap(), b.generate(10).unwrap());
        assert_eq!(a.generate(10).unwrap(), b.generate(10).unwrap());
    }

    #[test]
    fn codes_rarely_repeat() {
        let generator = NanoIdGenerator::new();
        let codes: HashSet<_> = (0..1_000)
            .map(|_| generator.generate(10).unwrap())
            .collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn every_symbol_is_reachable() {
        let generator = NanoIdGenerator::with_source(SeededRandom::new(1));
        let code = generator.generate(4_096).unwrap();
        let seen: HashSet<u8> = code.as_str().bytes().collect();
        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn concurrent_generation() {
        use std::sync::Arc;

        let generator = Arc::new(NanoIdGenerator::with_source(SeededRandom::new(9)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| generator.generate(12).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let all: HashSet<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 800);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NanoIdGenerator>();
        assert_send_sync::<NanoIdGenerator<SeededRandom>>();
    }
}
