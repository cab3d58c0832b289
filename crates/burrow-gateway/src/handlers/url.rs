use std::net::SocketAddr;

use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, ResolveUrlResponse, ShortUrlResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{Extensions, StatusCode};
use axum::Json;
use burrow_core::ShortCode;
use tracing::{debug, info};

/// Key used when the server was not started with connect info.
const UNKNOWN_CLIENT: &str = "unknown";

fn client_ip(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub async fn create_url_handler(
    State(state): State<AppState>,
    extensions: Extensions,
    payload: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortUrlResponse>)> {
    let client = client_ip(&extensions);
    if !state.admit_create(&client).await {
        debug!(client = %client, "create request rate limited");
        return Err(AppError::RateLimited);
    }

    // An unreadable body carries no URL at all.
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "rejected create request body");
        AppError::LongUrlRequired
    })?;
    let long_url = request.into_long_url()?;

    let record = state.shortener().create(&long_url).await?;
    info!(code = %record.code, "short url created");

    Ok((
        StatusCode::CREATED,
        Json(ShortUrlResponse {
            short_url: record.code.to_string(),
        }),
    ))
}

pub async fn get_url_handler(
    State(state): State<AppState>,
    Path(short_url): Path<String>,
) -> Result<Json<ResolveUrlResponse>> {
    // A malformed code can never name a record.
    let Ok(code) = ShortCode::new(short_url.as_str()) else {
        return Err(AppError::NotFound(short_url));
    };

    match state.shortener().resolve(&code).await? {
        Some(long_url) => Ok(Json(ResolveUrlResponse { long_url })),
        None => Err(AppError::NotFound(short_url)),
    }
}
