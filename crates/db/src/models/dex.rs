//! Row models for the synced reference tables.
//!
//! These carry database ids and are what the API reads back; the
//! write-side DTOs live in `dexhub_core::records`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use dexhub_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TypeEffectivenessRow {
    pub id: DbId,
    pub attacking_type: String,
    pub defending_type: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CompetitiveTierRow {
    pub id: DbId,
    pub pokemon_key: String,
    pub singles_tier: Option<String>,
    pub doubles_tier: Option<String>,
    pub national_dex_tier: Option<String>,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LearnsetRow {
    pub id: DbId,
    pub pokemon_key: String,
    pub move_key: String,
    pub generation: i32,
    pub learn_method: String,
    pub level: Option<i32>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MoveCompetitiveRow {
    pub id: DbId,
    pub sequential_id: i32,
    pub name: String,
    pub move_type: Option<String>,
    pub power: Option<i32>,
    pub accuracy: Option<i32>,
    pub pp: Option<i32>,
    pub priority: i32,
    pub category: Option<String>,
    pub target: Option<String>,
    pub flags: serde_json::Value,
    pub secondary_effect: Option<serde_json::Value>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub drain_ratio: Option<f64>,
    pub recoil_ratio: Option<f64>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AbilityRatingRow {
    pub id: DbId,
    pub ability_id: String,
    pub name: String,
    pub rating: f64,
    pub competitive_desc: Option<String>,
    pub flags: Option<serde_json::Value>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ItemShowdownRow {
    pub id: DbId,
    pub item_id: String,
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub fling_power: Option<i32>,
    pub is_choice: bool,
    pub is_nonstandard: bool,
    pub competitive_data: serde_json::Value,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QueryMetricRow {
    pub id: DbId,
    pub table_name: String,
    pub duration_ms: i64,
    pub success: bool,
    pub attempts: i32,
    pub created_at: Timestamp,
}
