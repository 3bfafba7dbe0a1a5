//! Repositories for the synced reference tables.
//!
//! Bulk writes follow the two refresh disciplines the sync jobs use:
//! full-replace repos expose `replace_all` (delete-everything then
//! batched inserts inside one transaction, so readers never observe a
//! partially refreshed table), the tier repo exposes `upsert_all`
//! (batched `ON CONFLICT` upserts, no clear). Batches sleep briefly
//! between writes to bound write pressure on the store.

use std::time::Duration;

pub mod ability_repo;
pub mod item_repo;
pub mod learnset_repo;
pub mod move_repo;
pub mod query_metric_repo;
pub mod tier_repo;
pub mod type_effectiveness_repo;

pub use ability_repo::AbilityRepo;
pub use item_repo::ItemRepo;
pub use learnset_repo::LearnsetRepo;
pub use move_repo::MoveRepo;
pub use query_metric_repo::QueryMetricRepo;
pub use tier_repo::TierRepo;
pub use type_effectiveness_repo::TypeEffectivenessRepo;

/// Pause between consecutive batch writes.
pub const INTER_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Sleep between batches, skipping the pause after the final one.
pub(crate) async fn batch_pause(batch_index: usize, batch_count: usize) {
    if batch_index + 1 < batch_count {
        tokio::time::sleep(INTER_BATCH_DELAY).await;
    }
}

/// Number of batches needed for `total` records at `batch_size`.
pub(crate) fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}
