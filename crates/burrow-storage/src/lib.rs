//! Persistent store adapters for URL records.

pub mod memory;
pub mod mysql;

pub use burrow_core::{StorageError, UrlRecord, UrlRepository};
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
