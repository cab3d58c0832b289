use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const ALLOWED_SCHEMES: [&str; 2] = ["http://", "https://"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    pub long_url: Option<String>,
}

impl CreateUrlRequest {
    /// Returns the long URL once it is present and uses an allowed scheme.
    ///
    /// The scheme match is case-sensitive and at least one character must
    /// follow it. Nothing else about the URL is inspected.
    pub fn into_long_url(self) -> Result<String> {
        let long_url = match self.long_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => return Err(AppError::LongUrlRequired),
        };

        let has_scheme = ALLOWED_SCHEMES.iter().any(|scheme| {
            long_url
                .strip_prefix(scheme)
                .is_some_and(|rest| !rest.is_empty())
        });
        if !has_scheme {
            return Err(AppError::LongUrlInvalid);
        }

        Ok(long_url)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlResponse {
    pub short_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveUrlResponse {
    pub long_url: String,
}
