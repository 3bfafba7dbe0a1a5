//! Ability-rating transformer.

use serde_json::Value;

use crate::error::CoreError;
use crate::names::capitalize;
use crate::records::AbilityRatingRecord;

/// Viability ratings are clamped into this range.
pub const RATING_MIN: f64 = -5.0;
pub const RATING_MAX: f64 = 5.0;

/// Transform the ability dataset.
///
/// Entries without a numeric `rating` field are dropped entirely; a
/// rating of 0 is a real rating and is retained. Retained ratings are
/// clamped to [-5, 5].
pub fn transform_abilities(raw: &Value) -> Result<Vec<AbilityRatingRecord>, CoreError> {
    let abilities = raw
        .as_object()
        .ok_or_else(|| CoreError::not_an_object("abilities", raw))?;

    let mut records = Vec::new();
    for (ability_id, entry) in abilities {
        let Some(rating) = entry.get("rating").and_then(Value::as_f64) else {
            continue;
        };

        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| capitalize(ability_id));

        let competitive_desc = entry
            .get("shortDesc")
            .or_else(|| entry.get("desc"))
            .and_then(Value::as_str)
            .map(str::to_string);

        records.push(AbilityRatingRecord {
            ability_id: ability_id.clone(),
            name,
            rating: rating.clamp(RATING_MIN, RATING_MAX),
            competitive_desc,
            flags: entry.get("flags").cloned().unwrap_or(Value::Null),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ratings_are_clamped_to_range() {
        let raw = json!({
            "overpowered": { "name": "Overpowered", "rating": 7 },
            "terrible": { "name": "Terrible", "rating": -9 },
            "intimidate": { "name": "Intimidate", "rating": 3.5 },
        });
        let records = transform_abilities(&raw).unwrap();

        let by_id = |id: &str| records.iter().find(|r| r.ability_id == id).unwrap();
        assert_eq!(by_id("overpowered").rating, 5.0);
        assert_eq!(by_id("terrible").rating, -5.0);
        assert_eq!(by_id("intimidate").rating, 3.5);
    }

    #[test]
    fn entries_without_a_rating_are_dropped() {
        let raw = json!({
            "unrated": { "name": "Unrated" },
            "honeygather": { "name": "Honey Gather", "rating": 0 },
        });
        let records = transform_abilities(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ability_id, "honeygather");
        assert_eq!(records[0].rating, 0.0);
    }

    #[test]
    fn short_desc_is_preferred_over_desc() {
        let raw = json!({
            "levitate": {
                "name": "Levitate",
                "rating": 3,
                "desc": "Long description.",
                "shortDesc": "Immune to Ground.",
            },
        });
        let records = transform_abilities(&raw).unwrap();
        assert_eq!(
            records[0].competitive_desc.as_deref(),
            Some("Immune to Ground.")
        );
    }
}
