//! Type-effectiveness transformer.
//!
//! The source encodes the chart as "damage taken": each type's entry
//! holds a `damageTaken` map keyed by the *attacking* type, with a
//! numeric code. The transformer inverts that into attacker-vs-defender
//! rows with real multipliers.

use serde_json::Value;

use crate::error::CoreError;
use crate::records::TypeEffectivenessRecord;

/// Map a source damage-taken code to a multiplier.
///
/// Codes: 0 = neutral, 1 = weak (2x), 2 = resist (0.5x), 3 = immune.
fn multiplier_for_code(code: i64) -> Option<f64> {
    match code {
        0 => Some(1.0),
        1 => Some(2.0),
        2 => Some(0.5),
        3 => Some(0.0),
        _ => None,
    }
}

/// Produce one record per (attacking, defending) pair.
///
/// Entries without a `damageTaken` object (the chart also carries
/// status-condition rows) and unknown codes are skipped.
pub fn transform_typechart(raw: &Value) -> Result<Vec<TypeEffectivenessRecord>, CoreError> {
    let chart = raw
        .as_object()
        .ok_or_else(|| CoreError::not_an_object("typechart", raw))?;

    let mut records = Vec::new();
    for (defending, entry) in chart {
        let Some(damage_taken) = entry.get("damageTaken").and_then(Value::as_object) else {
            continue;
        };
        for (attacking, code) in damage_taken {
            let Some(code) = code.as_i64() else { continue };
            let Some(multiplier) = multiplier_for_code(code) else {
                continue;
            };
            records.push(TypeEffectivenessRecord {
                attacking_type: attacking.clone(),
                defending_type: defending.clone(),
                multiplier,
            });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inverts_damage_taken_into_attacker_vs_defender() {
        let raw = json!({
            "Fire": { "damageTaken": { "Water": 1, "Grass": 2, "Fire": 2, "Ground": 1 } },
        });
        let records = transform_typechart(&raw).unwrap();

        let water_vs_fire = records
            .iter()
            .find(|r| r.attacking_type == "Water" && r.defending_type == "Fire")
            .unwrap();
        assert_eq!(water_vs_fire.multiplier, 2.0);

        let grass_vs_fire = records
            .iter()
            .find(|r| r.attacking_type == "Grass" && r.defending_type == "Fire")
            .unwrap();
        assert_eq!(grass_vs_fire.multiplier, 0.5);
    }

    #[test]
    fn code_zero_is_neutral_and_three_is_immune() {
        let raw = json!({
            "Normal": { "damageTaken": { "Normal": 0, "Ghost": 3 } },
        });
        let records = transform_typechart(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .any(|r| r.attacking_type == "Normal" && r.multiplier == 1.0));
        assert!(records
            .iter()
            .any(|r| r.attacking_type == "Ghost" && r.multiplier == 0.0));
    }

    #[test]
    fn full_two_type_chart_yields_four_unique_rows() {
        let raw = json!({
            "Fire":  { "damageTaken": { "Fire": 2, "Water": 1 } },
            "Water": { "damageTaken": { "Fire": 2, "Water": 2 } },
        });
        let records = transform_typechart(&raw).unwrap();
        assert_eq!(records.len(), 4);

        let mut pairs: Vec<_> = records
            .iter()
            .map(|r| (r.attacking_type.as_str(), r.defending_type.as_str()))
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 4, "every ordered pair appears exactly once");

        // Re-running on identical input is deterministic.
        let again = transform_typechart(&raw).unwrap();
        assert_eq!(records, again);
    }

    #[test]
    fn entries_without_damage_taken_are_skipped() {
        let raw = json!({
            "par": { "name": "Paralysis" },
            "Fire": { "damageTaken": { "Water": 1 } },
        });
        let records = transform_typechart(&raw).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn non_object_payload_is_a_transform_error() {
        let err = transform_typechart(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, CoreError::Transform { .. }));
    }
}
