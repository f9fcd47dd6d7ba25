//! Templated string fields.
//!
//! `description`, `markdownDescription`, `const` and `enum` values may use
//! context tokens:
//!
//! | token                  | value                                         |
//! |------------------------|-----------------------------------------------|
//! | `$title`               | nearest enclosing schema title                |
//! | `$description`         | nearest enclosing schema description          |
//! | `$markdownDescription` | nearest enclosing schema markdown description |
//! | `$fileName`            | source file stem                              |
//! | `$id`                  | canonical identifier of the document          |
//!
//! A token with no value in scope is left as written.

use super::tokens::Replacements;
use super::walker::{Annotation, ContextStack};
use serde_json::Value;

const ANNOTATIONS: [Annotation; 3] = [
    Annotation::Title,
    Annotation::Description,
    Annotation::MarkdownDescription,
];

/// Build the token table for a field `key` of the layer at `context`.
///
/// A field never substitutes its own annotation into itself, so
/// `description: "$description"` reads the enclosing schema's value.
pub fn context_table(context: &ContextStack, key: &str, file_name: &str, id: &str) -> Replacements {
    let mut table = Replacements::new()
        .with("fileName", file_name)
        .with("id", id);
    for annotation in ANNOTATIONS {
        let value = if annotation.key() == key {
            context.nearest_ancestor(annotation)
        } else {
            context.nearest(annotation)
        };
        if let Some(value) = value {
            table.insert(annotation.key(), value);
        }
    }
    table
}

/// Substitute tokens in a string, or in each string of an array.
///
/// Returns `true` if anything changed.
pub fn expand_field(value: &mut Value, table: &Replacements) -> bool {
    match value {
        Value::String(s) => expand_str(s, table),
        Value::Array(items) => items
            .iter_mut()
            .filter_map(|item| match item {
                Value::String(s) => Some(expand_str(s, table)),
                _ => None,
            })
            .fold(false, |changed, c| changed | c),
        _ => false,
    }
}

fn expand_str(s: &mut String, table: &Replacements) -> bool {
    let expanded = table.apply(s);
    if expanded == *s {
        return false;
    }
    *s = expanded;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::walker::{Directive, discover};
    use serde_json::json;

    fn table_for(doc: &Value, key: &str) -> Replacements {
        let found = discover(doc);
        let call = found
            .calls
            .iter()
            .find(|c| c.directive == Directive::Template { key: key.into() })
            .unwrap();
        context_table(&call.context, key, "damage", "actions/damage")
    }

    #[test]
    fn test_title_from_enclosing_schema() {
        let doc = json!({
            "title": "Damage",
            "properties": { "amount": { "description": "Amount dealt by $title." } }
        });
        let table = table_for(&doc, "description");
        let mut value = json!("Amount dealt by $title.");
        assert!(expand_field(&mut value, &table));
        assert_eq!(value, json!("Amount dealt by Damage."));
    }

    #[test]
    fn test_description_skips_itself() {
        let doc = json!({
            "description": "Outer",
            "items": { "description": "$description (inner)" }
        });
        let table = table_for(&doc, "description");
        assert_eq!(table.apply("$description (inner)"), "Outer (inner)");
    }

    #[test]
    fn test_file_tokens_in_enum() {
        let doc = json!({ "enum": ["origins:$fileName", 3, "$id"] });
        let table = table_for(&doc, "enum");
        let mut value = doc["enum"].clone();
        assert!(expand_field(&mut value, &table));
        assert_eq!(value, json!(["origins:damage", 3, "actions/damage"]));
    }

    #[test]
    fn test_missing_token_left_alone() {
        let doc = json!({ "const": "$title" });
        let table = table_for(&doc, "const");
        let mut value = json!("$title");
        assert!(!expand_field(&mut value, &table));
        assert_eq!(value, json!("$title"));
    }
}
