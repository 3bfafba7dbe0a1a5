//! Competitive-tier transformer (upsert dataset).

use chrono::Utc;
use serde_json::Value;

use crate::error::CoreError;
use crate::records::CompetitiveTierRecord;

fn tier_string(entry: &Value, field: &str) -> Option<String> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map per-Pokémon tier placements, stamping `updated_at` with the
/// transform time. Entries carrying none of the three tier fields are
/// dropped (they would upsert nothing useful).
pub fn transform_tiers(raw: &Value) -> Result<Vec<CompetitiveTierRecord>, CoreError> {
    let formats = raw
        .as_object()
        .ok_or_else(|| CoreError::not_an_object("tiers", raw))?;

    let now = Utc::now();
    let mut records = Vec::new();
    for (pokemon_key, entry) in formats {
        let singles_tier = tier_string(entry, "tier");
        let doubles_tier = tier_string(entry, "doublesTier");
        let national_dex_tier = tier_string(entry, "natDexTier");

        if singles_tier.is_none() && doubles_tier.is_none() && national_dex_tier.is_none() {
            continue;
        }
        records.push(CompetitiveTierRecord {
            pokemon_key: pokemon_key.clone(),
            singles_tier,
            doubles_tier,
            national_dex_tier,
            updated_at: now,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_all_three_tier_fields() {
        let raw = json!({
            "garchomp": { "tier": "OU", "doublesTier": "DOU", "natDexTier": "UU" },
        });
        let records = transform_tiers(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pokemon_key, "garchomp");
        assert_eq!(records[0].singles_tier.as_deref(), Some("OU"));
        assert_eq!(records[0].doubles_tier.as_deref(), Some("DOU"));
        assert_eq!(records[0].national_dex_tier.as_deref(), Some("UU"));
    }

    #[test]
    fn entries_without_any_tier_are_dropped() {
        let raw = json!({
            "missingno": { "isNonstandard": "Custom" },
            "pikachu": { "tier": "NU" },
        });
        let records = transform_tiers(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pokemon_key, "pikachu");
    }

    #[test]
    fn empty_tier_strings_count_as_absent() {
        let raw = json!({ "ditto": { "tier": "", "doublesTier": "DUU" } });
        let records = transform_tiers(&raw).unwrap();
        assert_eq!(records[0].singles_tier, None);
        assert_eq!(records[0].doubles_tier.as_deref(), Some("DUU"));
    }
}
