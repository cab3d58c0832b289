use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{create_url_handler, get_url_handler, health_handler};
use crate::state::AppState;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Self::router_with_timeout(state, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Builds the router, answering `408` for requests that run longer than
    /// `request_timeout`.
    pub fn router_with_timeout(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/v1/urls", post(create_url_handler))
            .route("/api/v1/urls/{short_url}", get(get_url_handler))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Method, Request};
    use burrow_cache::MokaUrlCache;
    use burrow_core::{ShortCode, StorageError, UrlRecord};
    use burrow_generator::{NanoIdGenerator, SeededRandom};
    use burrow_ratelimit::{
        CounterError, CounterStore, FailurePolicy, FixedWindowRateLimiter, InMemoryCounterStore,
    };
    use burrow_shortener::{Shortener, ShortenerConfig, ShortenerError, UrlShorteningService};
    use burrow_storage::InMemoryRepository;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_with_limit(rate_limit_per_minute: u64) -> AppState {
        let shortener = UrlShorteningService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(MokaUrlCache::new()),
            NanoIdGenerator::with_source(SeededRandom::new(42)),
            ShortenerConfig::default(),
        );
        let limiter =
            FixedWindowRateLimiter::new(InMemoryCounterStore::new(), FailurePolicy::FailClosed);
        AppState::new(Arc::new(shortener), Arc::new(limiter), rate_limit_per_minute)
    }

    fn test_router() -> Router {
        App::router(state_with_limit(60))
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Body>,
        client: Option<SocketAddr>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let mut request = builder.body(body.unwrap_or_else(Body::empty)).unwrap();
        if let Some(addr) = client {
            request.extensions_mut().insert(ConnectInfo(addr));
        }

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create(router: &Router, payload: Value) -> (StatusCode, Value) {
        send(
            router,
            Method::POST,
            "/api/v1/urls",
            Some(Body::from(payload.to_string())),
            None,
        )
        .await
    }

    async fn create_from(router: &Router, client: SocketAddr) -> StatusCode {
        send(
            router,
            Method::POST,
            "/api/v1/urls",
            Some(Body::from(json!({ "longUrl": "https://example.com" }).to_string())),
            Some(client),
        )
        .await
        .0
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&test_router(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let router = test_router();

        let (status, body) = create(&router, json!({ "longUrl": "https://example.com/x" })).await;
        assert_eq!(status, StatusCode::CREATED);
        let short_url = body["shortUrl"].as_str().unwrap().to_string();
        assert_eq!(short_url.len(), 7);

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/v1/urls/{short_url}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "longUrl": "https://example.com/x" }));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let (status, body) =
            send(&test_router(), Method::GET, "/api/v1/urls/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "code": 102, "message": "URL not found for shortUrl: nope" })
        );
    }

    #[tokio::test]
    async fn malformed_code_is_not_found() {
        let (status, body) =
            send(&test_router(), Method::GET, "/api/v1/urls/bad!code", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 102);
    }

    #[tokio::test]
    async fn missing_long_url_is_rejected() {
        let router = test_router();

        for payload in [json!({}), json!({ "longUrl": "" }), json!({ "longUrl": null })] {
            let (status, body) = create(&router, payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "code": 100, "message": "Long URL is required" }));
        }
    }

    #[tokio::test]
    async fn unreadable_body_is_rejected() {
        let (status, body) = send(
            &test_router(),
            Method::POST,
            "/api/v1/urls",
            Some(Body::from("{not json")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 100);
    }

    #[tokio::test]
    async fn non_http_url_is_rejected() {
        let (status, body) = create(&test_router(), json!({ "longUrl": "ftp://example.com" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "code": 101, "message": "Must start with http:// or https://" })
        );
    }

    #[tokio::test]
    async fn creation_is_rate_limited_per_client() {
        let router = App::router(state_with_limit(2));
        let alice: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let bob: SocketAddr = "10.0.0.2:5000".parse().unwrap();

        assert_eq!(create_from(&router, alice).await, StatusCode::CREATED);
        assert_eq!(create_from(&router, alice).await, StatusCode::CREATED);

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/urls",
            Some(Body::from(json!({ "longUrl": "https://example.com" }).to_string())),
            Some(alice),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, Value::Null);

        // Same IP from another port shares the bucket; another IP does not.
        let alice_again: SocketAddr = "10.0.0.1:6000".parse().unwrap();
        assert_eq!(
            create_from(&router, alice_again).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(create_from(&router, bob).await, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn resolve_is_not_rate_limited() {
        let router = App::router(state_with_limit(1));
        for _ in 0..5 {
            let (status, _) = send(&router, Method::GET, "/api/v1/urls/nope", None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    struct DownCounterStore;

    #[async_trait]
    impl CounterStore for DownCounterStore {
        async fn increment(&self, _key: &str) -> Result<u64, CounterError> {
            Err(CounterError::Unavailable("connection refused".into()))
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), CounterError> {
            Err(CounterError::Unavailable("connection refused".into()))
        }
    }

    fn state_with_down_limiter(policy: FailurePolicy) -> AppState {
        let shortener = UrlShorteningService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(MokaUrlCache::new()),
            NanoIdGenerator::new(),
            ShortenerConfig::default(),
        );
        let limiter = FixedWindowRateLimiter::new(DownCounterStore, policy);
        AppState::new(Arc::new(shortener), Arc::new(limiter), 60)
    }

    #[tokio::test]
    async fn limiter_outage_follows_policy() {
        let closed = App::router(state_with_down_limiter(FailurePolicy::FailClosed));
        let (status, _) = create(&closed, json!({ "longUrl": "https://example.com" })).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let open = App::router(state_with_down_limiter(FailurePolicy::FailOpen));
        let (status, _) = create(&open, json!({ "longUrl": "https://example.com" })).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    /// Shortener that fails every call with a fixed error.
    struct BrokenShortener(ShortenerError);

    #[async_trait]
    impl Shortener for BrokenShortener {
        async fn create(&self, _long_url: &str) -> burrow_shortener::Result<UrlRecord> {
            Err(self.0.clone())
        }

        async fn resolve(&self, _code: &ShortCode) -> burrow_shortener::Result<Option<String>> {
            Err(self.0.clone())
        }
    }

    fn broken_router(error: ShortenerError) -> Router {
        let limiter =
            FixedWindowRateLimiter::new(InMemoryCounterStore::new(), FailurePolicy::FailClosed);
        App::router(AppState::new(
            Arc::new(BrokenShortener(error)),
            Arc::new(limiter),
            60,
        ))
    }

    #[tokio::test]
    async fn alias_exists_is_conflict() {
        let router = broken_router(ShortenerError::AliasExists("abc1234".into()));

        let (status, body) = create(&router, json!({ "longUrl": "https://example.com" })).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({ "code": 102, "message": "Alias already exists: abc1234" })
        );
    }

    #[tokio::test]
    async fn store_failure_hides_detail() {
        let router = broken_router(ShortenerError::Storage(StorageError::Unavailable(
            "mysql://secret-host".into(),
        )));

        let (status, body) = create(&router, json!({ "longUrl": "https://example.com" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "code": 999, "message": "Unexpected error" }));

        let (status, body) = send(&router, Method::GET, "/api/v1/urls/abc1234", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 999);
    }
}
