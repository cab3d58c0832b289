mod url;

pub use url::{CreateUrlRequest, ResolveUrlResponse, ShortUrlResponse};

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
