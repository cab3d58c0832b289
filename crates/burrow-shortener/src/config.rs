use burrow_core::shortcode::MAX_LENGTH;
use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_CODE_LENGTH: usize = 7;
/// Longest primary code; leaves room for the one-character-longer retry.
pub const MAX_CODE_LENGTH: usize = MAX_LENGTH - 1;
pub const DEFAULT_HIT_QUEUE_CAPACITY: usize = 1024;

/// Tunables for [`UrlShorteningService`](crate::UrlShorteningService).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Length of generated codes, capped at [`MAX_CODE_LENGTH`]. A collision
    /// retry uses one more character.
    #[builder(default = DEFAULT_CODE_LENGTH)]
    pub code_length: usize,
    /// Lifetime of new records. `None` or zero means they never expire.
    #[builder(default)]
    pub default_ttl: Option<Duration>,
    /// Pending hit increments buffered before new hits are dropped.
    #[builder(default = DEFAULT_HIT_QUEUE_CAPACITY)]
    pub hit_queue_capacity: usize,
}

impl ShortenerConfig {
    /// The length actually requested from the generator.
    pub fn effective_code_length(&self) -> usize {
        self.code_length.min(MAX_CODE_LENGTH)
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
