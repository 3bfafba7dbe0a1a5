//! Normalized record types produced by the dataset transformers.
//!
//! These are the write-side DTOs: the sync jobs build them from raw
//! payloads and hand them to the repositories in `dexhub-db`. Read-side
//! row models (with database ids) live in the db crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Sync reporting
// ---------------------------------------------------------------------------

/// Outcome of one dataset sync run. Reported, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SyncJobResult {
    pub success: bool,
    pub source_name: String,
    pub records_processed: usize,
    pub error: Option<String>,
}

impl SyncJobResult {
    pub fn ok(source_name: &str, records_processed: usize) -> Self {
        Self {
            success: true,
            source_name: source_name.to_string(),
            records_processed,
            error: None,
        }
    }

    pub fn failed(source_name: &str, error: String) -> Self {
        Self {
            success: false,
            source_name: source_name.to_string(),
            records_processed: 0,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Type effectiveness (full-replace)
// ---------------------------------------------------------------------------

/// One attacker-vs-defender damage multiplier.
///
/// Exactly one row per ordered (attacking, defending) pair after a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEffectivenessRecord {
    pub attacking_type: String,
    pub defending_type: String,
    /// One of 0.0, 0.5, 1.0, 2.0.
    pub multiplier: f64,
}

// ---------------------------------------------------------------------------
// Competitive tiers (upsert on pokemon_key)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitiveTierRecord {
    pub pokemon_key: String,
    pub singles_tier: Option<String>,
    pub doubles_tier: Option<String>,
    pub national_dex_tier: Option<String>,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Learnsets (full-replace)
// ---------------------------------------------------------------------------

/// How a move is learned. Decoded from compact method tokens like `8L31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearnMethod {
    LevelUp,
    Machine,
    Tutor,
    Egg,
}

impl LearnMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelUp => "level-up",
            Self::Machine => "machine",
            Self::Tutor => "tutor",
            Self::Egg => "egg",
        }
    }

    /// Map a method letter from a learnset token. Unknown letters
    /// (event moves, virtual console transfers, ...) return `None` and
    /// the token is skipped.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(Self::LevelUp),
            'M' => Some(Self::Machine),
            'T' => Some(Self::Tutor),
            'E' => Some(Self::Egg),
            _ => None,
        }
    }
}

impl std::fmt::Display for LearnMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way for one Pokémon to learn one move. Duplicates over the
/// natural tuple are acceptable (multiple ways to learn a move).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnsetRecord {
    pub pokemon_key: String,
    pub move_key: String,
    pub generation: i32,
    pub learn_method: LearnMethod,
    pub level: Option<i32>,
}

// ---------------------------------------------------------------------------
// Moves (full-replace)
// ---------------------------------------------------------------------------

/// Secondary effect attached to a move (chance-based status, boosts, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecondaryEffect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatile_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boosts: Option<Value>,
}

impl SecondaryEffect {
    pub fn is_empty(&self) -> bool {
        self.chance.is_none()
            && self.status.is_none()
            && self.volatile_status.is_none()
            && self.boosts.is_none()
    }
}

/// Competitive move data.
///
/// `sequential_id` is assigned from the alphabetical sort of all source
/// keys on every sync run. It is stable within one run but NOT across
/// runs with differing source content; downstream consumers depend on
/// the existing numbering, so this behavior is preserved as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCompetitiveRecord {
    pub sequential_id: i32,
    pub name: String,
    pub move_type: Option<String>,
    pub power: Option<i32>,
    pub accuracy: Option<i32>,
    pub pp: Option<i32>,
    pub priority: i32,
    pub category: Option<String>,
    pub target: Option<String>,
    pub flags: Vec<String>,
    pub secondary_effect: Option<SecondaryEffect>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub drain_ratio: Option<f64>,
    pub recoil_ratio: Option<f64>,
}

// ---------------------------------------------------------------------------
// Ability ratings (full-replace)
// ---------------------------------------------------------------------------

/// Competitive viability rating for an ability, clamped to [-5, 5].
/// Source entries without a numeric rating are dropped entirely
/// (a rating of 0 is retained).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityRatingRecord {
    pub ability_id: String,
    pub name: String,
    pub rating: f64,
    pub competitive_desc: Option<String>,
    pub flags: Value,
}

// ---------------------------------------------------------------------------
// Items (full-replace)
// ---------------------------------------------------------------------------

/// Item category, inferred heuristically from the internal name and
/// structural fields. See [`crate::transform::items`] for the ordered
/// predicate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Berries,
    Medicine,
    Evolution,
    Battle,
    Holdable,
    Treasures,
    Pokeballs,
    Machines,
    KeyItems,
    Misc,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Berries => "berries",
            Self::Medicine => "medicine",
            Self::Evolution => "evolution",
            Self::Battle => "battle",
            Self::Holdable => "holdable",
            Self::Treasures => "treasures",
            Self::Pokeballs => "pokeballs",
            Self::Machines => "machines",
            Self::KeyItems => "key-items",
            Self::Misc => "misc",
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemShowdownRecord {
    pub item_id: String,
    /// Sanitized machine name (lowercase alphanumerics only).
    pub name: String,
    pub display_name: String,
    pub category: ItemCategory,
    pub fling_power: Option<i32>,
    pub is_choice: bool,
    pub is_nonstandard: bool,
    /// The raw source object, kept verbatim for consumers that need
    /// fields we do not model.
    pub competitive_data: Value,
}
