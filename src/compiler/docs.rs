//! Documentation correlation.
//!
//! Matches the fields of a documentation page against every `properties`
//! object of a compiled document. Mismatches are diagnostics only.

use super::diagnostic::{DiagnosticKind, Diagnostics};
use super::directive::IGNORED_FIELDS_KEY;
use crate::data::docs::{DocField, DocPage};
use rustc_hash::FxHashSet;
use serde_json::Value;

/// Names listed in the root `$IGNORED_FIELDS`.
pub fn ignored_fields(document: &Value) -> Vec<String> {
    match document.get(IGNORED_FIELDS_KEY) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

/// Correlate `document` with `page`.
///
/// The root and matched properties without a description receive the
/// documented one. Deprecated fields may be absent.
pub fn correlate(
    document: &mut Value,
    page: &DocPage,
    id: &str,
    ignored: &[String],
    diagnostics: &mut Diagnostics,
) {
    if let Value::Object(root) = document
        && !root.contains_key("description")
        && !page.description.is_empty()
    {
        root.insert(
            "description".to_owned(),
            Value::String(page.description.clone()),
        );
    }

    check_values(document, page, id, diagnostics);

    if page.fields.is_empty() {
        return;
    }
    let is_ignored = |name: &str| ignored.iter().any(|i| i == name);

    if document.get("type").and_then(Value::as_str) != Some("object") {
        diagnostics.push(
            DiagnosticKind::SchemaShapeMismatch,
            id,
            format!(
                "schema is not an object, but `{}` documents {} fields",
                page.title,
                page.fields.len()
            ),
        );
    }

    let mut found = FxHashSet::default();
    let mut declared = Vec::new();
    visit(document, page, &mut found, &mut declared);

    for field in &page.fields {
        if !found.contains(field.name.as_str()) && !field.deprecated && !is_ignored(&field.name) {
            diagnostics.push(
                DiagnosticKind::FieldMismatch,
                id,
                format!("documented field {} is missing", field_label(field)),
            );
        }
    }

    let mut reported = FxHashSet::default();
    for name in declared {
        if page.field(&name).is_none() && !is_ignored(&name) && reported.insert(name.clone()) {
            diagnostics.push(
                DiagnosticKind::FieldMismatch,
                id,
                format!("unexpected property `{name}` is not documented"),
            );
        }
    }
}

/// `` `source` (Damage Source, optional) ``
fn field_label(field: &DocField) -> String {
    let mut notes = Vec::new();
    if !field.type_name.is_empty() {
        notes.push(field.type_name.as_str());
    }
    if field.optional {
        notes.push("optional");
    }
    if notes.is_empty() {
        format!("`{}`", field.name)
    } else {
        format!("`{}` ({})", field.name, notes.join(", "))
    }
}

/// Documented values missing from a root `enum`.
fn check_values(document: &Value, page: &DocPage, id: &str, diagnostics: &mut Diagnostics) {
    let Some(Value::Array(members)) = document.get("enum") else {
        return;
    };
    for value in &page.values {
        if !members.iter().any(|m| m.as_str() == Some(value.as_str())) {
            diagnostics.push(
                DiagnosticKind::FieldMismatch,
                id,
                format!("documented value `{value}` is missing from enum"),
            );
        }
    }
}

fn visit<'p>(
    node: &mut Value,
    page: &'p DocPage,
    found: &mut FxHashSet<&'p str>,
    declared: &mut Vec<String>,
) {
    match node {
        Value::Array(items) => {
            for item in items {
                visit(item, page, found, declared);
            }
        }
        Value::Object(map) => {
            if let Some(Value::Object(properties)) = map.get_mut("properties") {
                for (name, property) in properties.iter_mut() {
                    declared.push(name.clone());
                    let Some(field) = page.field(name) else {
                        continue;
                    };
                    found.insert(field.name.as_str());
                    if let Value::Object(property) = property
                        && !property.contains_key("description")
                        && !field.description.is_empty()
                    {
                        property.insert(
                            "description".to_owned(),
                            Value::String(field.description.clone()),
                        );
                    }
                }
            }
            for value in map.values_mut() {
                visit(value, page, found, declared);
            }
        }
        _ => {}
    }
}
