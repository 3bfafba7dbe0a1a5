//! Per-dataset sync jobs and the concurrent runner.
//!
//! One job is a strict fetch → parse → transform → write pipeline.
//! Full-replace datasets clear their table inside the write
//! transaction; the tier dataset upserts on `pokemon_key` instead.
//! Jobs for different datasets run concurrently and are joined
//! all-settled, so one dataset's failure never blocks the others.

use std::time::Duration;

use sqlx::PgPool;

use dexhub_core::error::CoreError;
use dexhub_core::payload::ExportExtractor;
use dexhub_core::records::SyncJobResult;
use dexhub_core::transform;
use dexhub_db::repositories::{
    AbilityRepo, ItemRepo, LearnsetRepo, MoveRepo, TierRepo, TypeEffectivenessRepo,
};

use crate::fetch::{BackoffFetcher, FetchConfig, FetchError};

/// Records per batch write.
pub const BATCH_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Fetch failed for {dataset}: {source}")]
    Network {
        dataset: &'static str,
        #[source]
        source: FetchError,
    },

    /// Parse and transform failures, with the dataset name carried by
    /// the underlying [`CoreError`].
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Store write failed for {dataset}: {source}")]
    StoreWrite {
        dataset: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// The six external datasets, with their source path and export name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    TypeChart,
    Tiers,
    Learnsets,
    Moves,
    Abilities,
    Items,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::TypeChart,
        Dataset::Tiers,
        Dataset::Learnsets,
        Dataset::Moves,
        Dataset::Abilities,
        Dataset::Items,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeChart => "typechart",
            Self::Tiers => "tiers",
            Self::Learnsets => "learnsets",
            Self::Moves => "moves",
            Self::Abilities => "abilities",
            Self::Items => "items",
        }
    }

    /// Path of the script dump relative to the source base URL.
    fn source_path(&self) -> &'static str {
        match self {
            Self::TypeChart => "typechart.js",
            Self::Tiers => "formats-data.js",
            Self::Learnsets => "learnsets.js",
            Self::Moves => "moves.js",
            Self::Abilities => "abilities.js",
            Self::Items => "items.js",
        }
    }

    /// Name of the `exports.<X>` assignment inside the dump.
    fn export_name(&self) -> &'static str {
        match self {
            Self::TypeChart => "BattleTypeChart",
            Self::Tiers => "BattleFormatsData",
            Self::Learnsets => "BattleLearnsets",
            Self::Moves => "BattleMovedex",
            Self::Abilities => "BattleAbilities",
            Self::Items => "BattleItems",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the external reference service.
    pub source_base_url: String,
    pub fetch: FetchConfig,
}

impl SyncConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                  |
    /// |--------------------------|------------------------------------------|
    /// | `SHOWDOWN_DATA_URL`      | `https://play.pokemonshowdown.com/data`  |
    /// | `SYNC_FETCH_ATTEMPTS`    | `3`                                      |
    /// | `SYNC_FETCH_DELAY_MS`    | `1000`                                   |
    pub fn from_env() -> Self {
        let source_base_url = std::env::var("SHOWDOWN_DATA_URL")
            .unwrap_or_else(|_| "https://play.pokemonshowdown.com/data".into());

        let max_attempts: u32 = std::env::var("SYNC_FETCH_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let base_delay_ms: u64 = std::env::var("SYNC_FETCH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        Self {
            source_base_url,
            fetch: FetchConfig {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
            },
        }
    }

    fn url_for(&self, dataset: Dataset) -> String {
        format!(
            "{}/{}",
            self.source_base_url.trim_end_matches('/'),
            dataset.source_path()
        )
    }
}

// ---------------------------------------------------------------------------
// Job execution
// ---------------------------------------------------------------------------

/// Run one dataset's sync. With `dry_run`, fetch/parse/transform run
/// as a connectivity check and the record count is returned without
/// touching the store.
pub async fn run_dataset(
    pool: &PgPool,
    config: &SyncConfig,
    dataset: Dataset,
    dry_run: bool,
) -> Result<usize, SyncError> {
    let fetcher = BackoffFetcher::new(config.fetch.clone());
    let url = config.url_for(dataset);

    tracing::info!(dataset = %dataset, url, "Sync job starting");
    let raw = fetcher
        .fetch_text(&url)
        .await
        .map_err(|source| SyncError::Network {
            dataset: dataset.name(),
            source,
        })?;

    let extractor = ExportExtractor::new();
    let parsed = extractor.extract(&raw, dataset.export_name(), dataset.name())?;

    let written = match dataset {
        Dataset::TypeChart => {
            let records = transform::transform_typechart(&parsed)?;
            if dry_run {
                records.len()
            } else {
                write_full_replace(dataset, records.len(), || {
                    TypeEffectivenessRepo::replace_all(pool, &records, BATCH_SIZE)
                })
                .await?
            }
        }
        Dataset::Tiers => {
            let records = transform::transform_tiers(&parsed)?;
            if dry_run {
                records.len()
            } else {
                TierRepo::upsert_all(pool, &records, BATCH_SIZE)
                    .await
                    .map_err(|source| SyncError::StoreWrite {
                        dataset: dataset.name(),
                        source,
                    })? as usize
            }
        }
        Dataset::Learnsets => {
            let records = transform::transform_learnsets(&parsed)?;
            if dry_run {
                records.len()
            } else {
                write_full_replace(dataset, records.len(), || {
                    LearnsetRepo::replace_all(pool, &records, BATCH_SIZE)
                })
                .await?
            }
        }
        Dataset::Moves => {
            let records = transform::transform_moves(&parsed)?;
            if dry_run {
                records.len()
            } else {
                write_full_replace(dataset, records.len(), || {
                    MoveRepo::replace_all(pool, &records, BATCH_SIZE)
                })
                .await?
            }
        }
        Dataset::Abilities => {
            let records = transform::transform_abilities(&parsed)?;
            if dry_run {
                records.len()
            } else {
                write_full_replace(dataset, records.len(), || {
                    AbilityRepo::replace_all(pool, &records, BATCH_SIZE)
                })
                .await?
            }
        }
        Dataset::Items => {
            let records = transform::transform_items(&parsed)?;
            if dry_run {
                records.len()
            } else {
                write_full_replace(dataset, records.len(), || {
                    ItemRepo::replace_all(pool, &records, BATCH_SIZE)
                })
                .await?
            }
        }
    };

    tracing::info!(dataset = %dataset, records = written, dry_run, "Sync job finished");
    Ok(written)
}

async fn write_full_replace<F, Fut>(
    dataset: Dataset,
    record_count: usize,
    write: F,
) -> Result<usize, SyncError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<u64, sqlx::Error>>,
{
    write().await.map_err(|source| SyncError::StoreWrite {
        dataset: dataset.name(),
        source,
    })?;
    Ok(record_count)
}

/// Run the given datasets concurrently, joined all-settled. Each job's
/// failure is captured in its own [`SyncJobResult`].
pub async fn run_all(
    pool: &PgPool,
    config: &SyncConfig,
    datasets: &[Dataset],
    dry_run: bool,
) -> Vec<SyncJobResult> {
    let handles: Vec<_> = datasets
        .iter()
        .map(|&dataset| {
            let pool = pool.clone();
            let config = config.clone();
            tokio::spawn(async move {
                match run_dataset(&pool, &config, dataset, dry_run).await {
                    Ok(count) => SyncJobResult::ok(dataset.name(), count),
                    Err(e) => {
                        tracing::error!(dataset = %dataset, error = %e, "Sync job failed");
                        SyncJobResult::failed(dataset.name(), e.to_string())
                    }
                }
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (handle, dataset) in handles.into_iter().zip(datasets) {
        match handle.await {
            Ok(result) => results.push(result),
            // A panicked task still must not block sibling datasets.
            Err(e) => results.push(SyncJobResult::failed(dataset.name(), e.to_string())),
        }
    }
    results
}

/// Log the per-dataset report and the totals.
pub fn report_summary(results: &[SyncJobResult]) -> (usize, usize) {
    let mut succeeded = 0;
    let mut failed = 0;
    let mut total_records = 0;

    for result in results {
        if result.success {
            succeeded += 1;
            total_records += result.records_processed;
            tracing::info!(
                dataset = %result.source_name,
                records = result.records_processed,
                "Sync OK"
            );
        } else {
            failed += 1;
            tracing::error!(
                dataset = %result.source_name,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Sync FAILED"
            );
        }
    }

    tracing::info!(succeeded, failed, total_records, "Sync run complete");
    (succeeded, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_urls_join_cleanly() {
        let config = SyncConfig {
            source_base_url: "https://example.com/data/".into(),
            fetch: FetchConfig::default(),
        };
        assert_eq!(
            config.url_for(Dataset::TypeChart),
            "https://example.com/data/typechart.js"
        );
        assert_eq!(
            config.url_for(Dataset::Tiers),
            "https://example.com/data/formats-data.js"
        );
    }

    #[test]
    fn all_datasets_have_distinct_names_and_exports() {
        let names: std::collections::HashSet<_> =
            Dataset::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(names.len(), 6);

        let exports: std::collections::HashSet<_> =
            Dataset::ALL.iter().map(|d| d.export_name()).collect();
        assert_eq!(exports.len(), 6);
    }

    #[test]
    fn summary_counts_successes_and_failures() {
        let results = vec![
            SyncJobResult::ok("typechart", 324),
            SyncJobResult::failed("moves", "boom".into()),
            SyncJobResult::ok("items", 500),
        ];
        let (succeeded, failed) = report_summary(&results);
        assert_eq!(succeeded, 2);
        assert_eq!(failed, 1);
    }
}
