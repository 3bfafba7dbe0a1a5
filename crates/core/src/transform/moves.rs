//! Move-data transformer.

use serde_json::Value;

use crate::error::CoreError;
use crate::names::format_move_name;
use crate::records::{MoveCompetitiveRecord, SecondaryEffect};

/// Compute a ratio from a two-element `[numerator, denominator]` array.
fn ratio_from_pair(value: Option<&Value>) -> Option<f64> {
    let pair = value?.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let numerator = pair[0].as_f64()?;
    let denominator = pair[1].as_f64()?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Accuracy is either a number or `true` (never misses). `true` maps
/// to an absent accuracy.
fn accuracy_of(entry: &Value) -> Option<i32> {
    match entry.get("accuracy") {
        Some(Value::Number(n)) => n.as_i64().map(|v| v as i32),
        _ => None,
    }
}

fn opt_i32(entry: &Value, field: &str) -> Option<i32> {
    entry.get(field).and_then(Value::as_i64).map(|v| v as i32)
}

fn opt_string(entry: &Value, field: &str) -> Option<String> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flag names with truthy values, sorted for determinism.
fn flags_of(entry: &Value) -> Vec<String> {
    let Some(flags) = entry.get("flags").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut names: Vec<String> = flags
        .iter()
        .filter(|(_, v)| match v {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_i64() != Some(0),
            Value::Null => false,
            _ => true,
        })
        .map(|(k, _)| k.clone())
        .collect();
    names.sort();
    names
}

fn secondary_of(entry: &Value) -> Option<SecondaryEffect> {
    let secondary = entry.get("secondary")?;
    if !secondary.is_object() {
        return None;
    }
    let effect = SecondaryEffect {
        chance: secondary.get("chance").and_then(Value::as_f64),
        status: secondary
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string),
        volatile_status: secondary
            .get("volatileStatus")
            .and_then(Value::as_str)
            .map(str::to_string),
        boosts: secondary.get("boosts").filter(|v| !v.is_null()).cloned(),
    };
    if effect.is_empty() {
        None
    } else {
        Some(effect)
    }
}

/// Transform the move dataset.
///
/// `sequential_id` is assigned by a full alphabetical sort of the
/// source keys (1-based). Adding or removing a single upstream move
/// renumbers everything on the next run; that instability is the
/// established behavior and is kept.
pub fn transform_moves(raw: &Value) -> Result<Vec<MoveCompetitiveRecord>, CoreError> {
    let moves = raw
        .as_object()
        .ok_or_else(|| CoreError::not_an_object("moves", raw))?;

    let mut keys: Vec<&String> = moves.keys().collect();
    keys.sort();

    let mut records = Vec::with_capacity(keys.len());
    for (index, key) in keys.iter().enumerate() {
        let entry = &moves[key.as_str()];
        if !entry.is_object() {
            continue;
        }

        let authoritative = entry.get("name").and_then(Value::as_str);
        records.push(MoveCompetitiveRecord {
            sequential_id: (index + 1) as i32,
            name: format_move_name(key, authoritative),
            move_type: opt_string(entry, "type"),
            power: opt_i32(entry, "basePower"),
            accuracy: accuracy_of(entry),
            pp: opt_i32(entry, "pp"),
            priority: opt_i32(entry, "priority").unwrap_or(0),
            category: opt_string(entry, "category"),
            target: opt_string(entry, "target"),
            flags: flags_of(entry),
            secondary_effect: secondary_of(entry),
            description: opt_string(entry, "desc"),
            short_description: opt_string(entry, "shortDesc"),
            drain_ratio: ratio_from_pair(entry.get("drain")),
            recoil_ratio: ratio_from_pair(entry.get("recoil")),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drain_and_recoil_ratios_from_pairs() {
        let raw = json!({
            "drainpunch": { "name": "Drain Punch", "drain": [1, 2], "priority": 0 },
            "bravebird": { "name": "Brave Bird", "recoil": [1, 3], "priority": 0 },
        });
        let records = transform_moves(&raw).unwrap();

        let drain = records.iter().find(|r| r.name == "Drain Punch").unwrap();
        assert_eq!(drain.drain_ratio, Some(0.5));

        let recoil = records.iter().find(|r| r.name == "Brave Bird").unwrap();
        let ratio = recoil.recoil_ratio.unwrap();
        assert!((ratio - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn sequential_ids_follow_alphabetical_key_order() {
        let raw = json!({
            "tackle": { "name": "Tackle" },
            "absorb": { "name": "Absorb" },
            "megakick": { "name": "Mega Kick" },
        });
        let records = transform_moves(&raw).unwrap();
        assert_eq!(records[0].name, "Absorb");
        assert_eq!(records[0].sequential_id, 1);
        assert_eq!(records[1].name, "Mega Kick");
        assert_eq!(records[1].sequential_id, 2);
        assert_eq!(records[2].name, "Tackle");
        assert_eq!(records[2].sequential_id, 3);
    }

    #[test]
    fn adding_a_key_renumbers_later_moves() {
        let before = json!({ "bite": {}, "tackle": {} });
        let after = json!({ "bite": {}, "slam": {}, "tackle": {} });

        let tackle_before = transform_moves(&before)
            .unwrap()
            .into_iter()
            .find(|r| r.name == "Tackle")
            .unwrap();
        let tackle_after = transform_moves(&after)
            .unwrap()
            .into_iter()
            .find(|r| r.name == "Tackle")
            .unwrap();

        assert_eq!(tackle_before.sequential_id, 2);
        assert_eq!(tackle_after.sequential_id, 3);
    }

    #[test]
    fn true_accuracy_means_never_misses() {
        let raw = json!({
            "aerialace": { "name": "Aerial Ace", "accuracy": true },
            "focusblast": { "name": "Focus Blast", "accuracy": 70 },
        });
        let records = transform_moves(&raw).unwrap();
        assert_eq!(records[0].accuracy, None);
        assert_eq!(records[1].accuracy, Some(70));
    }

    #[test]
    fn truthy_flags_are_collected_sorted() {
        let raw = json!({
            "tackle": { "flags": { "contact": 1, "protect": 1, "bypasssub": 0 } },
        });
        let records = transform_moves(&raw).unwrap();
        assert_eq!(records[0].flags, vec!["contact", "protect"]);
    }

    #[test]
    fn secondary_effect_fields_are_extracted() {
        let raw = json!({
            "thunderbolt": {
                "secondary": { "chance": 10, "status": "par" },
            },
        });
        let records = transform_moves(&raw).unwrap();
        let secondary = records[0].secondary_effect.as_ref().unwrap();
        assert_eq!(secondary.chance, Some(10.0));
        assert_eq!(secondary.status.as_deref(), Some("par"));
        assert_eq!(secondary.volatile_status, None);
    }

    #[test]
    fn missing_name_falls_back_to_formatting_rules() {
        let raw = json!({ "gmaxcannonade": {}, "watergun": {} });
        let records = transform_moves(&raw).unwrap();
        assert_eq!(records[0].name, "G-Max Cannonade");
        assert_eq!(records[1].name, "Watergun");
    }
}
