use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_shortener::ShortenerError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Body of every error response except 429.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Long URL is required")]
    LongUrlRequired,
    #[error("Must start with http:// or https://")]
    LongUrlInvalid,
    #[error("URL not found for shortUrl: {0}")]
    NotFound(String),
    #[error("Alias already exists: {0}")]
    AliasExists(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Application error code carried in the response body.
    pub fn code(&self) -> u16 {
        match self {
            Self::LongUrlRequired => 100,
            Self::LongUrlInvalid => 101,
            Self::NotFound(_) | Self::AliasExists(_) => 102,
            Self::RateLimited | Self::Internal(_) => 999,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::LongUrlRequired | Self::LongUrlInvalid => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AliasExists(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ShortenerError> for AppError {
    fn from(error: ShortenerError) -> Self {
        match error {
            ShortenerError::AliasExists(code) => AppError::AliasExists(code),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::RateLimited => return status.into_response(),
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                String::from("Unexpected error")
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
