//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the record model and the storage, cache and clock
//! contracts shared by the shortener service, its adapters and the gateway.

pub mod cache;
pub mod clock;
pub mod error;
pub mod repository;
pub mod shortcode;

pub use cache::UrlCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, CoreError, StorageError};
pub use repository::{RecordId, UrlRecord, UrlRepository};
pub use shortcode::ShortCode;
