//! `$token` substitution.
//!
//! Substitution is plain text replacement. Tokens are applied longest name
//! first, so `$nameSpace` is never clobbered by a shorter `$name`.
//!
//! Inside JSON, a string literal that is exactly one token (`"$min"`) takes
//! the token's value as-is: numbers, booleans and `null` stay typed.

use serde_json::{Map, Value};

/// Token prefix in templates.
pub const TOKEN_PREFIX: char = '$';

/// Ordered `(token, value)` replacement table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replacements {
    pairs: Vec<(String, Value)>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Replacements::insert`].
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    /// Insert a string token, overriding an existing value for the same name.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.insert_value(token.into(), Value::String(value.into()));
    }

    fn insert_value(&mut self, token: String, value: Value) {
        match self.pairs.iter_mut().find(|(t, _)| *t == token) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((token, value)),
        }
    }

    /// Merge a caller-supplied table (`replace:` / `variables:` arguments).
    ///
    /// Non-string values keep their type for whole-literal substitution.
    pub fn extend_from_map(&mut self, map: &Map<String, Value>) {
        for (token, value) in map {
            self.insert_value(token.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs sorted by descending token length (stable for equal lengths).
    fn ordered(&self) -> Vec<&(String, Value)> {
        let mut pairs: Vec<_> = self.pairs.iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        pairs
    }

    /// Substitute every `$token` occurrence in `input`.
    pub fn apply(&self, input: &str) -> String {
        self.apply_with(input, |value| value.to_owned())
    }

    /// Substitute tokens across the serialized form of `value` and parse it back.
    ///
    /// Values are JSON-escaped before insertion, so multi-line strings and
    /// quotes survive the round trip inside string literals.
    pub fn apply_json(&self, value: &Value) -> serde_json::Result<Value> {
        if self.is_empty() {
            return Ok(value.clone());
        }
        let mut text = serde_json::to_string(value)?;
        for (token, value) in &self.pairs {
            if !value.is_string() {
                text = replace_literal(&text, token, &value.to_string());
            }
        }
        let text = self.apply_with(&text, escape_fragment);
        serde_json::from_str(&text)
    }

    fn apply_with(&self, input: &str, encode: impl Fn(&str) -> String) -> String {
        let mut out = input.to_owned();
        for (token, value) in self.ordered() {
            let needle = format!("{TOKEN_PREFIX}{token}");
            if out.contains(&needle) {
                out = out.replace(&needle, &encode(&text_of(value)));
            }
        }
        out
    }
}

/// Strings verbatim, anything else as its JSON text.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace every value literal `"$token"` in compact JSON with `bare`.
///
/// Escaped quotes are not literal boundaries, and keys (followed by `:`)
/// are left to plain substitution.
fn replace_literal(json: &str, token: &str, bare: &str) -> String {
    let needle = format!("\"{TOKEN_PREFIX}{token}\"");
    let mut out = String::with_capacity(json.len());
    let mut rest = json;
    while let Some(at) = rest.find(&needle) {
        let (head, tail) = rest.split_at(at);
        let after = &tail[needle.len()..];
        let escaped = head.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1;
        let is_key = after.starts_with(':');

        out.push_str(head);
        if escaped || is_key {
            // Keep the opening quote and continue after it.
            out.push('"');
            rest = &tail[1..];
        } else {
            out.push_str(bare);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// JSON-escape `raw` for insertion inside an existing string literal.
fn escape_fragment(raw: &str) -> String {
    let quoted = serde_json::to_string(raw).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or_default()
        .to_owned()
}

/// Check whether a string contains anything that looks like a token.
pub fn has_tokens(s: &str) -> bool {
    s.contains(TOKEN_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_longest_token_first() {
        let table = Replacements::new()
            .with("name", "X")
            .with("schemaName", "Y");
        assert_eq!(table.apply("$schemaName-$name"), "Y-X");
    }

    #[test]
    fn test_prefix_token_not_clobbered() {
        let table = Replacements::new()
            .with("name", "X")
            .with("nameSpace", "Z");
        assert_eq!(table.apply("$nameSpace/$name"), "Z/X");
    }

    #[test]
    fn test_insert_overrides() {
        let mut table = Replacements::new().with("item", "a");
        table.insert("item", "b");
        assert_eq!(table.apply("$item"), "b");
    }

    #[test]
    fn test_unknown_tokens_untouched() {
        let table = Replacements::new().with("item", "a");
        assert_eq!(table.apply("$other $item"), "$other a");
    }

    #[test]
    fn test_extend_from_map_literals() {
        let mut table = Replacements::new();
        let map = json!({ "count": 3, "flag": true, "label": "hi" });
        table.extend_from_map(map.as_object().unwrap());
        assert_eq!(table.apply("$count/$flag/$label"), "3/true/hi");
    }

    #[test]
    fn test_apply_json_escapes_values() {
        let table = Replacements::new().with("text", "line one\nsays \"hi\"");
        let value = json!({ "description": "$text" });
        let out = table.apply_json(&value).unwrap();
        assert_eq!(out, json!({ "description": "line one\nsays \"hi\"" }));
    }

    #[test]
    fn test_apply_json_in_keys() {
        let table = Replacements::new().with("schemaName", "damage");
        let value = json!({ "properties": { "type": { "const": "origins:$schemaName" } } });
        let out = table.apply_json(&value).unwrap();
        assert_eq!(
            out,
            json!({ "properties": { "type": { "const": "origins:damage" } } })
        );
    }

    #[test]
    fn test_apply_json_keeps_literal_types() {
        let mut table = Replacements::new();
        let map = json!({ "min": 5, "flag": true, "none": null, "label": "hi" });
        table.extend_from_map(map.as_object().unwrap());
        let value = json!({
            "minimum": "$min",
            "enabled": "$flag",
            "default": "$none",
            "title": "$label",
            "description": "at least $min",
            "$min": "$min"
        });
        let out = table.apply_json(&value).unwrap();
        assert_eq!(
            out,
            json!({
                "minimum": 5,
                "enabled": true,
                "default": null,
                "title": "hi",
                "description": "at least 5",
                "5": 5
            })
        );
    }

    #[test]
    fn test_replace_literal_skips_escaped_quotes() {
        let json = r#"{"a":"x\"$min","b":["$min"]}"#;
        assert_eq!(replace_literal(json, "min", "5"), r#"{"a":"x\"$min","b":[5]}"#);
    }

    #[test]
    fn test_has_tokens() {
        assert!(has_tokens("$title"));
        assert!(!has_tokens("plain"));
    }
}
