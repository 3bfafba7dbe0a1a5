//! Quasi-JSON normalizer for Showdown-style script dumps.
//!
//! The external data providers serve script payloads of the form
//! `exports.BattleTypeChart = { ... };` rather than strict JSON. This
//! module extracts the named object literal and coerces it into a
//! [`serde_json::Value`] via two strategies behind one trait:
//!
//! - [`StrictRepairParser`]: rewrite the literal (single quotes to
//!   double quotes, quote bareword keys, strip trailing commas) and
//!   parse it as strict JSON.
//! - [`LenientLiteralParser`]: a restricted recursive-descent scanner
//!   over the object-literal grammar (strings, numbers, booleans,
//!   null, arrays, objects, comments, trailing commas).
//!
//! The original system fell back to sandboxed script evaluation; that
//! is deliberately not ported. The lenient scanner covers the same
//! payloads without executing anything, and the [`PayloadParser`] seam
//! keeps both strategies replaceable.
//!
//! Both paths are best-effort against source-format drift.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Strategy-level failure. Wrapped into [`CoreError::Parse`] (with the
/// dataset name) by [`ExportExtractor`] once every strategy has failed.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("export `{0}` not found in payload")]
    ExportNotFound(String),

    #[error("strict JSON repair failed: {0}")]
    Strict(String),

    #[error("literal scan failed at byte {offset}: {reason}")]
    Lenient { offset: usize, reason: String },
}

// ---------------------------------------------------------------------------
// Parser trait and strategies
// ---------------------------------------------------------------------------

/// One strategy for turning a raw script payload into a parsed object.
pub trait PayloadParser: Send + Sync {
    fn extract(&self, raw: &str, export_name: &str) -> Result<Value, PayloadError>;
}

/// Primary strategy: regex-locate the export, repair the literal into
/// strict JSON, and parse with serde_json.
pub struct StrictRepairParser;

impl PayloadParser for StrictRepairParser {
    fn extract(&self, raw: &str, export_name: &str) -> Result<Value, PayloadError> {
        let literal = locate_export(raw, export_name)
            .ok_or_else(|| PayloadError::ExportNotFound(export_name.to_string()))?;
        let repaired = repair_literal(literal);
        serde_json::from_str(&repaired).map_err(|e| PayloadError::Strict(e.to_string()))
    }
}

/// Fallback strategy: scan the located literal with a restricted
/// object-literal grammar instead of evaluating it.
pub struct LenientLiteralParser;

impl PayloadParser for LenientLiteralParser {
    fn extract(&self, raw: &str, export_name: &str) -> Result<Value, PayloadError> {
        let literal = locate_export(raw, export_name)
            .ok_or_else(|| PayloadError::ExportNotFound(export_name.to_string()))?;
        Scanner::parse(literal)
    }
}

/// Tries each strategy in order; fails with [`CoreError::Parse`]
/// carrying the dataset name only after all strategies have failed.
pub struct ExportExtractor {
    strategies: Vec<Box<dyn PayloadParser>>,
}

impl ExportExtractor {
    pub fn new() -> Self {
        Self {
            strategies: vec![Box::new(StrictRepairParser), Box::new(LenientLiteralParser)],
        }
    }

    pub fn extract(&self, raw: &str, export_name: &str, dataset: &str) -> Result<Value, CoreError> {
        let mut reasons = Vec::new();
        for strategy in &self.strategies {
            match strategy.extract(raw, export_name) {
                Ok(value) => return Ok(value),
                Err(e) => reasons.push(e.to_string()),
            }
        }
        Err(CoreError::Parse {
            dataset: dataset.to_string(),
            reason: reasons.join("; "),
        })
    }
}

impl Default for ExportExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Export location
// ---------------------------------------------------------------------------

/// Find `exports.<name> = {...}` and return the balanced object
/// literal including its braces. String- and comment-aware so braces
/// inside quoted text do not unbalance the scan.
fn locate_export<'a>(raw: &'a str, export_name: &str) -> Option<&'a str> {
    let pattern = format!(r"exports\s*\.\s*{}\s*=", regex::escape(export_name));
    let re = Regex::new(&pattern).ok()?;
    let m = re.find(raw)?;

    let rest = &raw[m.end()..];
    let open = rest.find('{')?;
    let body = &rest[open..];
    let bytes = body.as_bytes();

    let mut depth = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[..=i]);
                }
            }
            b'"' | b'\'' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Strict repair
// ---------------------------------------------------------------------------

static BAREWORD_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)\s*:").expect("valid regex"));

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

/// Rewrite a loosely-formatted object literal into strict JSON:
/// single-quoted strings become double-quoted, bareword keys are
/// quoted, trailing commas before `]`/`}` are stripped.
///
/// The key/comma regexes can in principle match inside string bodies;
/// this is accepted as best-effort, with the lenient scanner as the
/// backstop for payloads the repair mangles.
fn repair_literal(src: &str) -> String {
    let requoted = requote_single_strings(src);
    let keyed = BAREWORD_KEY_RE.replace_all(&requoted, "$1\"$2\":");
    TRAILING_COMMA_RE.replace_all(&keyed, "$1").into_owned()
}

/// Convert single-quoted string literals into double-quoted ones,
/// escaping embedded double quotes and un-escaping embedded single
/// quotes. Double-quoted strings pass through untouched.
fn requote_single_strings(src: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        Double,
        Single,
    }

    let mut out = String::with_capacity(src.len());
    let mut state = State::Code;
    let mut chars = src.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '"' => {
                    state = State::Double;
                    out.push('"');
                }
                '\'' => {
                    state = State::Single;
                    out.push('"');
                }
                _ => out.push(c),
            },
            State::Double => match c {
                '\\' => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => {
                    state = State::Code;
                    out.push('"');
                }
                _ => out.push(c),
            },
            State::Single => match c {
                '\\' => match chars.next() {
                    Some('\'') => out.push('\''),
                    Some('"') => out.push_str("\\\""),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => {}
                },
                '"' => out.push_str("\\\""),
                '\'' => {
                    state = State::Code;
                    out.push('"');
                }
                _ => out.push(c),
            },
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Lenient literal scanner
// ---------------------------------------------------------------------------

/// Recursive-descent scanner over a restricted object-literal grammar.
///
/// Accepts: objects with quoted or bareword keys, arrays, strings in
/// any of the three quote styles, numbers, `true`/`false`/`null`
/// (plus `undefined`/`NaN`/`Infinity`, which map to null), trailing
/// commas, and `//` / `/* */` comments.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn parse(src: &'a str) -> Result<Value, PayloadError> {
        let mut scanner = Scanner {
            bytes: src.as_bytes(),
            pos: 0,
        };
        scanner.skip_trivia();
        let value = scanner.value()?;
        Ok(value)
    }

    fn fail(&self, reason: impl Into<String>) -> PayloadError {
        PayloadError::Lenient {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                self.pos += 1;
            }
            match (self.peek(), self.bytes.get(self.pos + 1).copied()) {
                (Some(b'/'), Some(b'/')) => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.pos += 2;
                    while self.pos + 1 < self.bytes.len()
                        && !(self.bytes[self.pos] == b'*' && self.bytes[self.pos + 1] == b'/')
                    {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                _ => return,
            }
        }
    }

    fn value(&mut self) -> Result<Value, PayloadError> {
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(q @ (b'"' | b'\'' | b'`')) => Ok(Value::String(self.string(q)?)),
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'+' || b == b'.' => self.number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {
                let word = self.ident();
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" | "NaN" | "Infinity" => Ok(Value::Null),
                    other => Err(self.fail(format!("unexpected identifier `{other}`"))),
                }
            }
            Some(b) => Err(self.fail(format!("unexpected byte `{}`", b as char))),
            None => Err(self.fail("unexpected end of input")),
        }
    }

    fn object(&mut self) -> Result<Value, PayloadError> {
        self.pos += 1; // consume '{'
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
                None => return Err(self.fail("unterminated object")),
            }

            let key = self.key()?;
            self.skip_trivia();
            if self.peek() != Some(b':') {
                return Err(self.fail(format!("expected `:` after key `{key}`")));
            }
            self.pos += 1;
            self.skip_trivia();
            let value = self.value()?;
            map.insert(key, value);
        }
    }

    fn key(&mut self) -> Result<String, PayloadError> {
        match self.peek() {
            Some(q @ (b'"' | b'\'' | b'`')) => self.string(q),
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'-' => {
                Ok(self.ident())
            }
            _ => Err(self.fail("expected object key")),
        }
    }

    fn array(&mut self) -> Result<Value, PayloadError> {
        self.pos += 1; // consume '['
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => items.push(self.value()?),
                None => return Err(self.fail("unterminated array")),
            }
        }
    }

    fn string(&mut self, quote: u8) -> Result<String, PayloadError> {
        self.pos += 1; // consume opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(b'r') => out.push('\r'),
                        Some(b'u') => {
                            let start = self.pos + 1;
                            let end = (start + 4).min(self.bytes.len());
                            let hex = std::str::from_utf8(&self.bytes[start..end])
                                .ok()
                                .and_then(|s| u32::from_str_radix(s, 16).ok())
                                .and_then(char::from_u32);
                            match hex {
                                Some(c) => {
                                    out.push(c);
                                    self.pos += 4;
                                }
                                None => return Err(self.fail("invalid \\u escape")),
                            }
                        }
                        Some(b) => out.push(b as char),
                        None => return Err(self.fail("unterminated escape")),
                    }
                    self.pos += 1;
                }
                Some(_) => {
                    // Multi-byte UTF-8 sequences are copied through intact.
                    let rest = std::str::from_utf8(&self.bytes[self.pos..])
                        .map_err(|_| self.fail("invalid UTF-8"))?;
                    let c = rest.chars().next().ok_or_else(|| self.fail("empty string"))?;
                    out.push(c);
                    self.pos += c.len_utf8();
                }
                None => return Err(self.fail("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<Value, PayloadError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| self.fail("invalid number"))?;

        if !text.contains(['.', 'e', 'E']) {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
        }
        let f: f64 = text
            .parse()
            .map_err(|_| self.fail(format!("invalid number `{text}`")))?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.fail("non-finite number"))
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'-'))
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLEAN_PAYLOAD: &str = r#"
        "use strict";
        exports.BattleTypeChart = {
            "fire": { "damageTaken": { "Water": 1, "Grass": 2 } }
        };
    "#;

    #[test]
    fn strict_parses_clean_payload() {
        let value = StrictRepairParser
            .extract(CLEAN_PAYLOAD, "BattleTypeChart")
            .unwrap();
        assert_eq!(value["fire"]["damageTaken"]["Water"], json!(1));
    }

    #[test]
    fn strict_repairs_single_quotes_and_bareword_keys() {
        let raw = "exports.Moves = {tackle: {name: 'Tackle', basePower: 40,},};";
        let value = StrictRepairParser.extract(raw, "Moves").unwrap();
        assert_eq!(value["tackle"]["name"], json!("Tackle"));
        assert_eq!(value["tackle"]["basePower"], json!(40));
    }

    #[test]
    fn strict_strips_trailing_commas_in_arrays() {
        let raw = "exports.Data = {list: [1, 2, 3,],};";
        let value = StrictRepairParser.extract(raw, "Data").unwrap();
        assert_eq!(value["list"], json!([1, 2, 3]));
    }

    #[test]
    fn lenient_handles_comments_and_mixed_quotes() {
        let raw = r#"
            exports.Items = {
                // a comment the strict path chokes on
                leftovers: {
                    name: "Leftovers",
                    desc: 'Restores 1/16 HP.',
                    fling: { basePower: 10 }, /* inline */
                },
            };
        "#;
        let value = LenientLiteralParser.extract(raw, "Items").unwrap();
        assert_eq!(value["leftovers"]["name"], json!("Leftovers"));
        assert_eq!(value["leftovers"]["fling"]["basePower"], json!(10));
    }

    #[test]
    fn lenient_maps_undefined_to_null() {
        let raw = "exports.Data = {a: undefined, b: true};";
        let value = LenientLiteralParser.extract(raw, "Data").unwrap();
        assert_eq!(value["a"], Value::Null);
        assert_eq!(value["b"], json!(true));
    }

    #[test]
    fn extractor_falls_back_when_strict_fails() {
        // The comment breaks serde_json; the scanner handles it.
        let raw = "exports.Data = {\n // note\n key: 1\n};";
        let value = ExportExtractor::new()
            .extract(raw, "Data", "typechart")
            .unwrap();
        assert_eq!(value["key"], json!(1));
    }

    #[test]
    fn extractor_reports_dataset_on_total_failure() {
        let err = ExportExtractor::new()
            .extract("nothing here", "Missing", "learnsets")
            .unwrap_err();
        match err {
            CoreError::Parse { dataset, .. } => assert_eq!(dataset, "learnsets"),
            other => panic!("expected Parse error, got {other}"),
        }
    }

    #[test]
    fn braces_inside_strings_do_not_unbalance_the_scan() {
        let raw = r#"exports.Data = {desc: "uses { and } freely", n: 2};"#;
        let value = StrictRepairParser.extract(raw, "Data").unwrap();
        assert_eq!(value["n"], json!(2));
    }
}
