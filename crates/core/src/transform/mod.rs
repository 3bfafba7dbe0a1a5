//! Dataset transformers: pure functions from raw parsed payloads to
//! normalized record arrays, one per external dataset.
//!
//! Each transformer is deterministic given its input and performs no
//! I/O. Malformed top-level shapes produce [`CoreError::Transform`];
//! individually malformed entries are skipped, matching the
//! best-effort posture of the upstream data.
//!
//! [`CoreError::Transform`]: crate::error::CoreError

pub mod abilities;
pub mod items;
pub mod learnsets;
pub mod moves;
pub mod tiers;
pub mod typechart;

pub use abilities::transform_abilities;
pub use items::transform_items;
pub use learnsets::transform_learnsets;
pub use moves::transform_moves;
pub use tiers::transform_tiers;
pub use typechart::transform_typechart;
