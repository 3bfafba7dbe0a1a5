use std::sync::Arc;

use dexhub_db::optimizer::QueryOptimizer;

use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: dexhub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Query optimizer with cache and metrics, shared with the
    /// maintenance task.
    pub optimizer: Arc<QueryOptimizer>,
    /// Sliding-window rate limiter, shared with its sweep task.
    pub rate_limiter: Arc<RateLimiter>,
}
