//! Sliding-window rate limiting for the API routes.
//!
//! Each client (first `x-forwarded-for` entry, else the peer address)
//! gets an ordered list of request timestamps. On every request the
//! entries older than the window are pruned; if fewer than
//! `max_requests` remain the request is recorded and forwarded,
//! otherwise a 429 is returned without invoking the handler.
//!
//! State is in-process only: when several instances run behind a load
//! balancer each instance counts its own share, so the effective limit
//! is higher than configured. Known limitation.
//!
//! A sweep task drops keys that have gone quiet so the map does not
//! grow with one entry per client forever.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// How often the sweep task runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Keys whose newest timestamp is older than this are dropped by the
/// sweep task.
const ENTRY_MAX_AGE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per client within one window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Namespace prepended to client keys.
    pub key_prefix: String,
}

/// Outcome of a rate-limit check. Reset times are unix seconds.
#[derive(Debug)]
pub enum RateLimitDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at_secs: i64,
    },
    Limited {
        limit: u32,
        retry_after_secs: i64,
        reset_at_secs: i64,
    },
}

pub struct RateLimiter {
    config: RateLimitConfig,
    /// `prefix:client` -> ordered request timestamps (unix millis).
    buckets: Mutex<HashMap<String, Vec<i64>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, chrono::Utc::now().timestamp_millis())
    }

    /// Check with an explicit clock, so the window logic is testable
    /// without sleeping.
    pub fn check_at(&self, client: &str, now_ms: i64) -> RateLimitDecision {
        let window_ms = self.config.window_ms as i64;
        let limit = self.config.max_requests;
        let key = format!("{}:{}", self.config.key_prefix, client);

        let mut buckets = self.buckets.lock().expect("rate limit lock poisoned");
        let timestamps = buckets.entry(key).or_default();
        timestamps.retain(|&t| t > now_ms - window_ms);

        if (timestamps.len() as u32) < limit {
            timestamps.push(now_ms);
            let oldest = timestamps[0];
            RateLimitDecision::Allowed {
                limit,
                remaining: limit - timestamps.len() as u32,
                reset_at_secs: (oldest + window_ms) / 1000,
            }
        } else {
            // Full window: the slot frees up when the oldest surviving
            // timestamp ages out. With a zero limit the list stays
            // empty and the next window is the best answer we have.
            let oldest = timestamps.first().copied().unwrap_or(now_ms);
            let retry_after_ms = (oldest + window_ms - now_ms).max(0);
            RateLimitDecision::Limited {
                limit,
                retry_after_secs: ((retry_after_ms + 999) / 1000).max(1),
                reset_at_secs: (oldest + window_ms) / 1000,
            }
        }
    }

    /// Drop keys with no timestamp younger than [`ENTRY_MAX_AGE`].
    /// Returns the number of keys removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn sweep_at(&self, now_ms: i64) -> usize {
        let cutoff = now_ms - ENTRY_MAX_AGE.as_millis() as i64;
        let mut buckets = self.buckets.lock().expect("rate limit lock poisoned");
        let before = buckets.len();
        buckets.retain(|_, timestamps| timestamps.last().is_some_and(|&t| t > cutoff));
        before - buckets.len()
    }

    /// Number of tracked client keys.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().expect("rate limit lock poisoned").len()
    }
}

// ---------------------------------------------------------------------------
// Axum middleware
// ---------------------------------------------------------------------------

/// Rate-limit middleware, wired with
/// `axum::middleware::from_fn_with_state(Arc<RateLimiter>, rate_limit)`.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    match limiter.check(&client) {
        RateLimitDecision::Allowed {
            limit,
            remaining,
            reset_at_secs,
        } => {
            let mut response = next.run(request).await;
            apply_headers(response.headers_mut(), limit, remaining, reset_at_secs);
            response
        }
        RateLimitDecision::Limited {
            limit,
            retry_after_secs,
            reset_at_secs,
        } => {
            tracing::warn!(
                client = %client,
                retry_after_secs,
                "Rate limit exceeded, rejecting request"
            );

            let body = json!({
                "error": "Too many requests",
                "code": "RATE_LIMITED",
            });
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
            apply_headers(response.headers_mut(), limit, 0, reset_at_secs);
            response.headers_mut().insert(
                header::RETRY_AFTER,
                header_value(retry_after_secs.to_string()),
            );
            response
        }
    }
}

/// First `x-forwarded-for` entry, else the peer address from
/// `ConnectInfo`, else `"unknown"` (e.g. in tests without either).
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_at_secs: i64) {
    headers.insert("x-ratelimit-limit", header_value(limit.to_string()));
    headers.insert("x-ratelimit-remaining", header_value(remaining.to_string()));
    headers.insert("x-ratelimit-reset", header_value(reset_at_secs.to_string()));
}

fn header_value(value: String) -> HeaderValue {
    // Numeric strings are always valid header values.
    HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("0"))
}

// ---------------------------------------------------------------------------
// Sweep task
// ---------------------------------------------------------------------------

/// Periodically drop stale client keys. Runs until `cancel` is
/// triggered.
pub async fn run_sweeper(limiter: Arc<RateLimiter>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        max_age_secs = ENTRY_MAX_AGE.as_secs(),
        "Rate limit sweep task started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limit sweep task stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Rate limit sweep: dropped stale clients");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn limiter(max_requests: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_ms,
            key_prefix: "test".into(),
        })
    }

    #[test]
    fn allows_up_to_the_limit_with_decreasing_remaining() {
        let limiter = limiter(3, 60_000);
        let now = 1_000_000;

        for expected_remaining in [2, 1, 0] {
            assert_matches!(
                limiter.check_at("1.2.3.4", now),
                RateLimitDecision::Allowed { remaining, .. } if remaining == expected_remaining
            );
        }
        assert_matches!(
            limiter.check_at("1.2.3.4", now),
            RateLimitDecision::Limited { .. }
        );
    }

    #[test]
    fn window_slides_as_old_timestamps_age_out() {
        let limiter = limiter(2, 10_000);

        assert_matches!(
            limiter.check_at("c", 0),
            RateLimitDecision::Allowed { .. }
        );
        assert_matches!(
            limiter.check_at("c", 5_000),
            RateLimitDecision::Allowed { .. }
        );
        assert_matches!(
            limiter.check_at("c", 9_000),
            RateLimitDecision::Limited { .. }
        );
        // The t=0 entry has aged out by t=11s, freeing one slot.
        assert_matches!(
            limiter.check_at("c", 11_000),
            RateLimitDecision::Allowed { remaining: 0, .. }
        );
    }

    #[test]
    fn retry_after_counts_down_to_the_oldest_slot() {
        let limiter = limiter(1, 10_000);

        assert_matches!(
            limiter.check_at("c", 0),
            RateLimitDecision::Allowed { .. }
        );
        // 4s left on the window, rounded up.
        assert_matches!(
            limiter.check_at("c", 6_500),
            RateLimitDecision::Limited { retry_after_secs: 4, .. }
        );
    }

    #[test]
    fn zero_limit_rejects_every_request_without_panicking() {
        let limiter = limiter(0, 10_000);
        let now = 50_000;

        assert_matches!(
            limiter.check_at("c", now),
            RateLimitDecision::Limited { retry_after_secs, reset_at_secs, .. } => {
                assert!(retry_after_secs >= 1);
                assert_eq!(reset_at_secs, (now + 10_000) / 1000);
            }
        );
    }

    #[test]
    fn clients_are_tracked_independently() {
        let limiter = limiter(1, 60_000);
        let now = 42_000;

        assert_matches!(
            limiter.check_at("a", now),
            RateLimitDecision::Allowed { .. }
        );
        assert_matches!(
            limiter.check_at("a", now),
            RateLimitDecision::Limited { .. }
        );
        assert_matches!(
            limiter.check_at("b", now),
            RateLimitDecision::Allowed { .. }
        );
    }

    #[test]
    fn sweep_drops_only_stale_keys() {
        let limiter = limiter(5, 60_000);
        let now = 10_000_000;

        limiter.check_at("old", now - 700_000);
        limiter.check_at("fresh", now - 1_000);
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.sweep_at(now), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
