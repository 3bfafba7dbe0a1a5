//! Learnset transformer.
//!
//! Source shape: `{ pokemon: { learnset: { movekey: ["8L31", "7M", ...] } } }`.
//! Each method token packs `<generation><methodLetter><level?>` into one
//! string; a single regex decodes it. Tokens that do not match the
//! pattern (event moves, transfer-only markers, ...) are silently
//! skipped.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;
use crate::records::{LearnMethod, LearnsetRecord};

static METHOD_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([A-Z])(\d+)?$").expect("valid regex"));

/// Decode a single method token. Returns `None` for anything the
/// pattern or the method-letter table does not recognize.
pub fn decode_method_token(token: &str) -> Option<(i32, LearnMethod, Option<i32>)> {
    let caps = METHOD_TOKEN_RE.captures(token)?;
    let generation: i32 = caps[1].parse().ok()?;
    let method = LearnMethod::from_letter(caps[2].chars().next()?)?;
    let level = caps.get(3).and_then(|m| m.as_str().parse().ok());
    Some((generation, method, level))
}

pub fn transform_learnsets(raw: &Value) -> Result<Vec<LearnsetRecord>, CoreError> {
    let pokemon_map = raw
        .as_object()
        .ok_or_else(|| CoreError::not_an_object("learnsets", raw))?;

    let mut records = Vec::new();
    for (pokemon_key, entry) in pokemon_map {
        let Some(learnset) = entry.get("learnset").and_then(Value::as_object) else {
            continue;
        };
        for (move_key, tokens) in learnset {
            let Some(tokens) = tokens.as_array() else { continue };
            for token in tokens {
                let Some(token) = token.as_str() else { continue };
                let Some((generation, learn_method, level)) = decode_method_token(token) else {
                    continue;
                };
                records.push(LearnsetRecord {
                    pokemon_key: pokemon_key.clone(),
                    move_key: move_key.clone(),
                    generation,
                    learn_method,
                    level,
                });
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_up_token_carries_generation_and_level() {
        let (generation, method, level) = decode_method_token("8L31").unwrap();
        assert_eq!(generation, 8);
        assert_eq!(method, LearnMethod::LevelUp);
        assert_eq!(level, Some(31));
    }

    #[test]
    fn machine_token_has_no_level() {
        let (generation, method, level) = decode_method_token("5M").unwrap();
        assert_eq!(generation, 5);
        assert_eq!(method, LearnMethod::Machine);
        assert_eq!(level, None);
    }

    #[test]
    fn tutor_and_egg_letters_decode() {
        assert_eq!(decode_method_token("7T").unwrap().1, LearnMethod::Tutor);
        assert_eq!(decode_method_token("6E").unwrap().1, LearnMethod::Egg);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(decode_method_token("XYZ").is_none());
        // `S` (event) and `V` (virtual console) are real source letters
        // outside the supported method table.
        assert!(decode_method_token("8S0").is_none());
        assert!(decode_method_token("7V").is_none());
        assert!(decode_method_token("").is_none());
    }

    #[test]
    fn unmatched_tokens_yield_zero_records_for_that_move() {
        let raw = json!({
            "pikachu": {
                "learnset": {
                    "thunderbolt": ["8M", "8L42"],
                    "surf": ["8S0"],
                }
            }
        });
        let records = transform_learnsets(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.move_key == "thunderbolt"));
    }

    #[test]
    fn duplicate_natural_tuples_are_allowed() {
        let raw = json!({
            "eevee": { "learnset": { "tackle": ["8L1", "7L10"] } }
        });
        let records = transform_learnsets(&raw).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn entries_without_learnset_are_skipped() {
        let raw = json!({ "mew": {} });
        assert!(transform_learnsets(&raw).unwrap().is_empty());
    }
}
