//! URL shortening service.
//!
//! This crate orchestrates code generation, persistence, cache-aside
//! resolution and background hit counting. Storage and cache backends are
//! injected through the contracts in `burrow_core`.

pub mod config;
pub mod error;
pub mod hits;
pub mod service;
pub mod shortener;

pub use config::{ShortenerConfig, MAX_CODE_LENGTH};
pub use error::{Result, ShortenerError};
pub use hits::HitTracker;
pub use service::UrlShorteningService;
pub use shortener::Shortener;
