//! Periodic optimizer maintenance.
//!
//! Spawns a background task that sweeps expired cache entries, prunes
//! old `query_metrics` rows past their retention window, and removes
//! orphaned learnset rows. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dexhub_db::optimizer::QueryOptimizer;

/// Default interval between maintenance passes: 10 minutes.
const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Run the maintenance loop until `cancel` is triggered.
///
/// The interval is configurable via `MAINTENANCE_INTERVAL_SECS`.
pub async fn run(optimizer: Arc<QueryOptimizer>, cancel: CancellationToken) {
    let interval_secs: u64 = std::env::var("MAINTENANCE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);

    tracing::info!(interval_secs, "Maintenance job started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Maintenance job stopping");
                break;
            }
            _ = interval.tick() => {
                let report = optimizer.perform_maintenance().await;
                tracing::info!(
                    expired_cache_entries = report.expired_cache_entries,
                    pruned_metric_rows = ?report.pruned_metric_rows,
                    removed_orphans = ?report.removed_orphans,
                    "Maintenance pass complete"
                );
            }
        }
    }
}
