//! Query optimizer: cache lookup, timeout-bounded execution,
//! retry-with-backoff, cache population, and per-table metrics.
//!
//! Wraps arbitrary read thunks. The cache stores serialized JSON
//! values keyed by caller-supplied strings, with per-entry TTLs, lazy
//! age-check eviction on read, and an insertion-order size bound
//! (oldest inserted entry dropped first, not least-recently-used).
//!
//! The optimizer is a constructor-injected instance owned by whoever
//! composes it (the API's `AppState`), not a process global.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::metrics::{MetricsSnapshot, MetricsStore};
use crate::repositories::{LearnsetRepo, QueryMetricRepo};
use crate::DbPool;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default retention for persisted `query_metrics` rows: 7 days.
const DEFAULT_METRICS_RETENTION_HOURS: i64 = 168;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Cache size bound; the oldest inserted entry is evicted beyond it.
    pub max_cache_entries: usize,
    /// Base for the exponential retry backoff (`base * 2^(attempt-1)`).
    pub retry_base_delay: Duration,
    /// Queries slower than this land in the recent-slow-query log.
    pub slow_query_threshold: Duration,
    /// Queries slower than this additionally emit a warning log line.
    pub very_slow_threshold: Duration,
    /// Capacity of the slow-query and failure logs.
    pub recent_log_capacity: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 500,
            retry_base_delay: Duration::from_secs(1),
            slow_query_threshold: Duration::from_secs(2),
            very_slow_threshold: Duration::from_secs(5),
            recent_log_capacity: 50,
        }
    }
}

/// Per-call configuration surface.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub cache_key: Option<String>,
    pub cache_ttl: Duration,
    pub retry_count: u32,
    pub timeout: Duration,
    pub enable_cache: bool,
    pub enable_metrics: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache_key: None,
            cache_ttl: Duration::from_secs(60),
            retry_count: 2,
            timeout: Duration::from_secs(10),
            enable_cache: true,
            enable_metrics: true,
        }
    }
}

impl QueryOptions {
    /// Options for a cached read with the given key and TTL.
    pub fn cached(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache_key: Some(key.into()),
            cache_ttl: ttl,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("Query on {table} timed out after {timeout_ms} ms ({attempts} attempts)")]
    Timeout {
        table: String,
        timeout_ms: u64,
        attempts: u32,
    },

    #[error("Query on {table} failed after {attempts} attempts: {source}")]
    Exhausted {
        table: String,
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

/// Per-attempt failure, folded into an [`OptimizerError`] once retries
/// are exhausted.
enum AttemptError {
    TimedOut,
    Store(sqlx::Error),
}

impl AttemptError {
    fn describe(&self) -> String {
        match self {
            Self::TimedOut => "timed out".to_string(),
            Self::Store(e) => e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

struct CacheEntry {
    data: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

struct QueryCache {
    entries: IndexMap<String, CacheEntry>,
    max_entries: usize,
}

impl QueryCache {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            max_entries,
        }
    }

    /// Expired entries are dropped on read rather than returned.
    fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.shift_remove(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        }
    }

    fn insert(&mut self, key: String, data: Value, ttl: Duration) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            // Insertion-order eviction: drop the oldest inserted entry.
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    fn sweep_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Percentage in [0, 100].
    pub success_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub error: String,
}

/// Result of [`QueryOptimizer::batch_operation`]. Per-operation
/// failures are collected here, never thrown.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub successful: Vec<T>,
    pub failed: Vec<BatchFailure>,
    pub stats: BatchStats,
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// What a maintenance pass accomplished. `None` means the step failed
/// or had no pool to run against; failures never abort the other steps.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub expired_cache_entries: usize,
    pub pruned_metric_rows: Option<u64>,
    pub removed_orphans: Option<u64>,
}

// ---------------------------------------------------------------------------
// QueryOptimizer
// ---------------------------------------------------------------------------

pub struct QueryOptimizer {
    pool: Option<DbPool>,
    config: OptimizerConfig,
    cache: Mutex<QueryCache>,
    metrics: Mutex<MetricsStore>,
}

impl QueryOptimizer {
    /// An optimizer without a pool: metrics samples stay in memory only
    /// and maintenance skips the database steps.
    pub fn new(config: OptimizerConfig) -> Self {
        let cache = Mutex::new(QueryCache::new(config.max_cache_entries));
        let metrics = Mutex::new(MetricsStore::new(config.recent_log_capacity));
        Self {
            pool: None,
            config,
            cache,
            metrics,
        }
    }

    pub fn with_pool(pool: DbPool, config: OptimizerConfig) -> Self {
        Self {
            pool: Some(pool),
            ..Self::new(config)
        }
    }

    /// Execute a read thunk with caching, a per-attempt timeout, and
    /// exponential-backoff retry.
    ///
    /// With a cache key and an unexpired entry the thunk is not
    /// invoked at all. On success the result is cached (if a key was
    /// given) and a metrics sample is recorded.
    pub async fn run<T, F, Fut>(
        &self,
        table: &str,
        thunk: F,
        opts: QueryOptions,
    ) -> Result<T, OptimizerError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        if opts.enable_cache {
            if let Some(key) = &opts.cache_key {
                let cached = self.cache.lock().expect("cache lock poisoned").get(key);
                if let Some(value) = cached {
                    if let Ok(result) = serde_json::from_value(value) {
                        tracing::debug!(table, cache_key = %key, "Query cache hit");
                        return Ok(result);
                    }
                }
            }
        }

        let started = Instant::now();
        let max_attempts = opts.retry_count + 1;
        let mut attempts = 0u32;

        let last_error = loop {
            attempts += 1;
            match tokio::time::timeout(opts.timeout, thunk()).await {
                Ok(Ok(result)) => {
                    let duration = started.elapsed();
                    if opts.enable_cache {
                        if let Some(key) = &opts.cache_key {
                            if let Ok(value) = serde_json::to_value(&result) {
                                self.cache
                                    .lock()
                                    .expect("cache lock poisoned")
                                    .insert(key.clone(), value, opts.cache_ttl);
                            }
                        }
                    }
                    self.record_sample(table, duration, true, attempts, opts.enable_metrics, None)
                        .await;
                    return Ok(result);
                }
                Ok(Err(e)) => {
                    tracing::warn!(table, attempt = attempts, error = %e, "Query attempt failed");
                    if attempts >= max_attempts {
                        break AttemptError::Store(e);
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        table,
                        attempt = attempts,
                        timeout_ms = opts.timeout.as_millis() as u64,
                        "Query attempt timed out"
                    );
                    if attempts >= max_attempts {
                        break AttemptError::TimedOut;
                    }
                }
            }
            let backoff = self.config.retry_base_delay * 2u32.pow(attempts - 1);
            tokio::time::sleep(backoff).await;
        };

        let duration = started.elapsed();
        self.record_sample(
            table,
            duration,
            false,
            attempts,
            opts.enable_metrics,
            Some(last_error.describe()),
        )
        .await;

        Err(match last_error {
            AttemptError::TimedOut => OptimizerError::Timeout {
                table: table.to_string(),
                timeout_ms: opts.timeout.as_millis() as u64,
                attempts,
            },
            AttemptError::Store(source) => OptimizerError::Exhausted {
                table: table.to_string(),
                attempts,
                source,
            },
        })
    }

    async fn record_sample(
        &self,
        table: &str,
        duration: Duration,
        success: bool,
        attempts: u32,
        enable_metrics: bool,
        error: Option<String>,
    ) {
        if !enable_metrics {
            return;
        }
        let duration_ms = duration.as_millis() as u64;
        {
            let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
            metrics.record(table, duration_ms, success);
            if duration >= self.config.slow_query_threshold {
                metrics.record_slow(table, duration_ms, attempts);
            }
            if let Some(error) = error {
                metrics.record_failure(table, error, attempts);
            }
        }
        if duration >= self.config.very_slow_threshold {
            tracing::warn!(table, duration_ms, attempts, "Very slow query");
        }

        // Persisting the sample is best-effort; a full analytics table
        // must never fail a read path.
        if let Some(pool) = &self.pool {
            if let Err(e) =
                QueryMetricRepo::insert(pool, table, duration_ms as i64, success, attempts as i32)
                    .await
            {
                tracing::debug!(table, error = %e, "Failed to persist query metric");
            }
        }
    }

    /// Execute a set of write operations in fixed-size chunks, each
    /// chunk's operations running concurrently. Failures are collected
    /// per operation and never abort the batch.
    pub async fn batch_operation<T, F, Fut>(
        &self,
        table: &str,
        ops: Vec<F>,
        batch_size: usize,
    ) -> BatchOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let total = ops.len();
        let mut successful = Vec::new();
        let mut failed = Vec::new();

        let mut indexed: Vec<(usize, F)> = ops.into_iter().enumerate().collect();
        while !indexed.is_empty() {
            let rest = indexed.split_off(batch_size.max(1).min(indexed.len()));
            let chunk = std::mem::replace(&mut indexed, rest);

            let results =
                futures::future::join_all(chunk.into_iter().map(|(index, op)| async move {
                    (index, op().await)
                }))
                .await;

            for (index, result) in results {
                match result {
                    Ok(value) => successful.push(value),
                    Err(e) => failed.push(BatchFailure {
                        index,
                        error: e.to_string(),
                    }),
                }
            }
        }

        let success_count = successful.len();
        let error_count = failed.len();
        let success_rate = if total == 0 {
            100.0
        } else {
            success_count as f64 * 100.0 / total as f64
        };
        if error_count > 0 {
            tracing::warn!(table, total, error_count, "Batch operation had failures");
        }

        BatchOutcome {
            successful,
            failed,
            stats: BatchStats {
                total,
                success_count,
                error_count,
                success_rate,
            },
        }
    }

    /// Periodic maintenance: expired-cache sweep, retention pruning of
    /// old analytics rows, and best-effort orphan cleanup. Each step
    /// tolerates the others failing.
    pub async fn perform_maintenance(&self) -> MaintenanceReport {
        let expired_cache_entries = self
            .cache
            .lock()
            .expect("cache lock poisoned")
            .sweep_expired();

        let mut pruned_metric_rows = None;
        let mut removed_orphans = None;

        if let Some(pool) = &self.pool {
            let retention_hours: i64 = std::env::var("QUERY_METRICS_RETENTION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_METRICS_RETENTION_HOURS);
            let cutoff = chrono::Utc::now() - chrono::Duration::hours(retention_hours);

            match QueryMetricRepo::delete_older_than(pool, cutoff).await {
                Ok(deleted) => pruned_metric_rows = Some(deleted),
                Err(e) => tracing::error!(error = %e, "Maintenance: metric pruning failed"),
            }

            match LearnsetRepo::delete_orphaned(pool).await {
                Ok(deleted) => removed_orphans = Some(deleted),
                Err(e) => tracing::error!(error = %e, "Maintenance: orphan cleanup failed"),
            }
        }

        MaintenanceReport {
            expired_cache_entries,
            pruned_metric_rows,
            removed_orphans,
        }
    }

    /// Point-in-time metrics view for the stats route.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.lock().expect("metrics lock poisoned").snapshot()
    }

    /// Current number of live cache entries.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().expect("cache lock poisoned").len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config() -> OptimizerConfig {
        OptimizerConfig {
            retry_base_delay: Duration::from_millis(5),
            ..OptimizerConfig::default()
        }
    }

    #[tokio::test]
    async fn cached_call_executes_the_thunk_exactly_once() {
        let optimizer = QueryOptimizer::new(fast_config());
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let result: i64 = optimizer
                .run(
                    "moves",
                    move || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, sqlx::Error>(42)
                        }
                    },
                    QueryOptions::cached("k", Duration::from_secs(60)),
                )
                .await
                .unwrap();
            assert_eq!(result, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_reexecutes_the_thunk() {
        let optimizer = QueryOptimizer::new(fast_config());
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let _: i64 = optimizer
                .run(
                    "moves",
                    move || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, sqlx::Error>(1)
                        }
                    },
                    QueryOptions::cached("k", Duration::from_millis(10)),
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oldest_inserted_entry_is_evicted_at_capacity() {
        let optimizer = QueryOptimizer::new(OptimizerConfig {
            max_cache_entries: 2,
            ..fast_config()
        });

        for key in ["a", "b", "c"] {
            let _: i64 = optimizer
                .run(
                    "t",
                    || async { Ok::<_, sqlx::Error>(7) },
                    QueryOptions::cached(key, Duration::from_secs(60)),
                )
                .await
                .unwrap();
        }
        assert_eq!(optimizer.cache_len(), 2);

        // "a" was evicted, so this call re-executes the thunk.
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);
        let _: i64 = optimizer
            .run(
                "t",
                move || {
                    let calls = Arc::clone(&calls_in);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, sqlx::Error>(7)
                    }
                },
                QueryOptions::cached("a", Duration::from_secs(60)),
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success_with_backoff() {
        let optimizer = QueryOptimizer::new(fast_config());
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);

        let result: String = optimizer
            .run(
                "tiers",
                move || {
                    let calls = Arc::clone(&calls_in);
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(sqlx::Error::PoolTimedOut)
                        } else {
                            Ok("ok".to_string())
                        }
                    }
                },
                QueryOptions {
                    retry_count: 3,
                    ..QueryOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_store_error() {
        let optimizer = QueryOptimizer::new(fast_config());

        let result: Result<i64, _> = optimizer
            .run(
                "abilities",
                || async { Err::<i64, _>(sqlx::Error::PoolTimedOut) },
                QueryOptions {
                    retry_count: 1,
                    ..QueryOptions::default()
                },
            )
            .await;

        match result.unwrap_err() {
            OptimizerError::Exhausted { table, attempts, .. } => {
                assert_eq!(table, "abilities");
                assert_eq!(attempts, 2);
            }
            other => panic!("expected Exhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn slow_thunk_times_out() {
        let optimizer = QueryOptimizer::new(fast_config());

        let result: Result<i64, _> = optimizer
            .run(
                "items",
                || async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, sqlx::Error>(1)
                },
                QueryOptions {
                    timeout: Duration::from_millis(10),
                    retry_count: 0,
                    ..QueryOptions::default()
                },
            )
            .await;

        assert!(matches!(
            result.unwrap_err(),
            OptimizerError::Timeout { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn batch_operation_tolerates_partial_failure() {
        let optimizer = QueryOptimizer::new(fast_config());

        let ops: Vec<_> = (0..10)
            .map(|i| {
                move || async move {
                    if i == 4 {
                        Err(sqlx::Error::PoolTimedOut)
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();

        let outcome = optimizer.batch_operation("learnsets", ops, 3).await;
        assert_eq!(outcome.successful.len(), 9);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 4);
        assert_eq!(outcome.stats.total, 10);
        assert_eq!(outcome.stats.success_count, 9);
        assert_eq!(outcome.stats.error_count, 1);
        assert_eq!(outcome.stats.success_rate, 90.0);
    }

    #[tokio::test]
    async fn maintenance_without_pool_only_sweeps_the_cache() {
        let optimizer = QueryOptimizer::new(fast_config());
        let _: i64 = optimizer
            .run(
                "t",
                || async { Ok::<_, sqlx::Error>(1) },
                QueryOptions::cached("short", Duration::from_millis(5)),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = optimizer.perform_maintenance().await;
        assert_eq!(report.expired_cache_entries, 1);
        assert_eq!(report.pruned_metric_rows, None);
        assert_eq!(report.removed_orphans, None);
    }

    #[tokio::test]
    async fn failures_land_in_the_recent_failure_log() {
        let optimizer = QueryOptimizer::new(fast_config());
        let _: Result<i64, _> = optimizer
            .run(
                "moves",
                || async { Err::<i64, _>(sqlx::Error::PoolTimedOut) },
                QueryOptions {
                    retry_count: 0,
                    ..QueryOptions::default()
                },
            )
            .await;

        let snapshot = optimizer.metrics_snapshot();
        assert_eq!(snapshot.recent_failures.len(), 1);
        assert_eq!(snapshot.recent_failures[0].table, "moves");
        assert_eq!(snapshot.tables[0].failed_queries, 1);
    }
}
