//! Item transformer with heuristic category classification.
//!
//! Categories are decided by an ordered list of `(predicate, category)`
//! pairs evaluated top to bottom; the first match wins and `misc` is
//! the fallback. The order is fixed and load-bearing (a Berry named
//! "Oran Berry" must classify as berries even though it is holdable).

use serde_json::Value;

use crate::error::CoreError;
use crate::records::{ItemCategory, ItemShowdownRecord};

fn has_substring(id: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| id.contains(n))
}

fn truthy(entry: &Value, field: &str) -> bool {
    match entry.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() != Some(0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// The ordered classification table. First predicate returning true
/// decides the category; nothing matching falls through to `misc`.
fn classify(item_id: &str, entry: &Value) -> ItemCategory {
    type Predicate = fn(&str, &Value) -> bool;
    const TABLE: &[(Predicate, ItemCategory)] = &[
        (
            |id, e| truthy(e, "isBerry") || id.ends_with("berry"),
            ItemCategory::Berries,
        ),
        (
            |id, _| has_substring(id, &["potion", "heal", "revive", "ether", "elixir", "antidote"]),
            ItemCategory::Medicine,
        ),
        (
            |id, _| has_substring(id, &["stone", "scale", "upgrade"]),
            ItemCategory::Evolution,
        ),
        (
            |id, e| {
                truthy(e, "isChoice")
                    || e.get("boosts").is_some_and(|b| b.is_object())
                    || has_substring(id, &["orb", "herb", "lens", "band", "belt", "specs"])
            },
            ItemCategory::Battle,
        ),
        (
            |id, _| has_substring(id, &["incense", "plate", "drive", "memory", "gem", "seed"]),
            ItemCategory::Holdable,
        ),
        (
            |id, _| has_substring(id, &["nugget", "pearl", "shard", "relic", "star"]),
            ItemCategory::Treasures,
        ),
        (
            |id, e| truthy(e, "isPokeball") || id.ends_with("ball"),
            ItemCategory::Pokeballs,
        ),
        (
            |id, _| {
                (id.starts_with("tm") || id.starts_with("tr"))
                    && id[2..].chars().all(|c| c.is_ascii_digit())
                    && id.len() > 2
            },
            ItemCategory::Machines,
        ),
        (
            |id, _| has_substring(id, &["key", "card", "pass", "ticket", "letter"]),
            ItemCategory::KeyItems,
        ),
    ];

    for (predicate, category) in TABLE {
        if predicate(item_id, entry) {
            return *category;
        }
    }
    ItemCategory::Misc
}

/// Lowercase alphanumeric machine name derived from a display name.
pub fn sanitize_name(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn transform_items(raw: &Value) -> Result<Vec<ItemShowdownRecord>, CoreError> {
    let items = raw
        .as_object()
        .ok_or_else(|| CoreError::not_an_object("items", raw))?;

    let mut records = Vec::new();
    for (item_id, entry) in items {
        if !entry.is_object() {
            continue;
        }
        let display_name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(item_id)
            .to_string();

        let fling_power = entry
            .get("fling")
            .and_then(|f| f.get("basePower"))
            .and_then(Value::as_i64)
            .map(|v| v as i32);

        records.push(ItemShowdownRecord {
            item_id: item_id.clone(),
            name: sanitize_name(&display_name),
            display_name: display_name.clone(),
            category: classify(item_id, entry),
            fling_power,
            is_choice: truthy(entry, "isChoice") || item_id.starts_with("choice"),
            is_nonstandard: truthy(entry, "isNonstandard"),
            competitive_data: entry.clone(),
        });
    }
    Ok(records)
}
