//! Dataset sync entry point.
//!
//! Usage: `dexhub-sync [--dry-run] [--<dataset>-only]`
//!
//! With no dataset flag all six datasets run concurrently; exactly one
//! `--<dataset>-only` flag narrows the run to that dataset. `--dry-run`
//! fetches, parses, and transforms without writing to the store.
//!
//! Per-dataset failures are reported in the summary and do not affect
//! the exit code; only uncaught errors (bad flags, missing
//! configuration, unreachable database) exit non-zero.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dexhub_sync::jobs::{self, Dataset, SyncConfig};

fn dataset_for_flag(flag: &str) -> Option<Dataset> {
    match flag {
        "--type-only" => Some(Dataset::TypeChart),
        "--tiers-only" => Some(Dataset::Tiers),
        "--learnsets-only" => Some(Dataset::Learnsets),
        "--moves-only" => Some(Dataset::Moves),
        "--abilities-only" => Some(Dataset::Abilities),
        "--items-only" => Some(Dataset::Items),
        _ => None,
    }
}

fn usage() -> ! {
    eprintln!(
        "usage: dexhub-sync [--dry-run] [--type-only | --tiers-only | --learnsets-only | \
         --moves-only | --abilities-only | --items-only]"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dexhub_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut dry_run = false;
    let mut selected: Option<Dataset> = None;

    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else if let Some(dataset) = dataset_for_flag(&arg) {
            if selected.replace(dataset).is_some() {
                eprintln!("error: more than one dataset flag given");
                usage();
            }
        } else {
            eprintln!("error: unknown flag `{arg}`");
            usage();
        }
    }

    let datasets: Vec<Dataset> = match selected {
        Some(dataset) => vec![dataset],
        None => Dataset::ALL.to_vec(),
    };

    let config = SyncConfig::from_env();
    tracing::info!(
        source = %config.source_base_url,
        datasets = datasets.len(),
        dry_run,
        "Starting sync run"
    );

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = dexhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    dexhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let results = jobs::run_all(&pool, &config, &datasets, dry_run).await;
    jobs::report_summary(&results);
}
