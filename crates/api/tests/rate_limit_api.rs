//! Integration tests for the rate-limit middleware over a real router.
//!
//! Uses a minimal router with the middleware attached, so no database
//! is needed; the limiter itself is the unit under test.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use dexhub_api::middleware::rate_limit::{self, RateLimitConfig, RateLimiter};

fn test_app(max_requests: u32) -> Router {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_requests,
        window_ms: 60_000,
        key_prefix: "test".into(),
    }));

    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit,
        ))
}

fn ping_from(client: &str) -> Request<Body> {
    Request::builder()
        .uri("/ping")
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

fn header<'a>(response: &'a Response<axum::body::Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn requests_within_the_limit_pass_with_decreasing_remaining() {
    let app = test_app(3);

    for expected_remaining in ["2", "1", "0"] {
        let response = app.clone().oneshot(ping_from("10.0.0.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-limit"), "3");
        assert_eq!(header(&response, "x-ratelimit-remaining"), expected_remaining);
        assert!(!header(&response, "x-ratelimit-reset").is_empty());
    }
}

#[tokio::test]
async fn request_over_the_limit_is_rejected_without_reaching_the_handler() {
    let app = test_app(3);

    for _ in 0..3 {
        let response = app.clone().oneshot(ping_from("10.0.0.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(ping_from("10.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "x-ratelimit-remaining"), "0");

    let retry_after: i64 = header(&response, "retry-after").parse().unwrap();
    assert!(retry_after >= 1);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");
    assert_eq!(body["error"], "Too many requests");
}

#[tokio::test]
async fn distinct_forwarded_clients_get_separate_budgets() {
    let app = test_app(1);

    let first = app.clone().oneshot(ping_from("10.0.0.3")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let blocked = app.clone().oneshot(ping_from("10.0.0.3")).await.unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app.clone().oneshot(ping_from("10.0.0.4")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn forwarded_for_uses_only_the_first_entry() {
    let app = test_app(1);

    let request = Request::builder()
        .uri("/ping")
        .header("x-forwarded-for", "10.0.0.5, 172.16.0.1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same client behind a different proxy chain shares the budget.
    let request = Request::builder()
        .uri("/ping")
        .header("x-forwarded-for", "10.0.0.5, 192.168.0.9")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
