//! HTTP boundary for the Burrow URL shortener.
//!
//! Validates requests, applies per-client rate limiting to code creation and
//! maps service errors to JSON error bodies.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::AppError;
pub use state::AppState;
