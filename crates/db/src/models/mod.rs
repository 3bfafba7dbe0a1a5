//! Read-side row models, one struct per table.

pub mod dex;

pub use dex::{
    AbilityRatingRow, CompetitiveTierRow, ItemShowdownRow, LearnsetRow, MoveCompetitiveRow,
    QueryMetricRow, TypeEffectivenessRow,
};
