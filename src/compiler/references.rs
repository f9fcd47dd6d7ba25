//! Reference tokens.
//!
//! A reference token names another template by namespace and path:
//!
//! ```text
//! ref(types:vector)            →  ../types/vector.json
//! $ref(actions:damage#/$defs)  →  ../actions/damage.json#/$defs
//! ref(:#/definitions/x)        →  #/definitions/x
//! ```
//!
//! Tokens are rewritten when a document is written, relative to that
//! document's own output file. A token whose source file does not exist is
//! reported once and replaced by its inner text.

use super::diagnostic::{DiagnosticKind, Diagnostics};
use super::directive::NO_REF_CHECK_KEY;
use super::paths::PathMapper;
use regex::{Captures, Regex};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// `ref(<namespace>:<path>)`, optionally prefixed with `$`.
pub static REF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?ref\(([^():\s]*):([^()\s]+)\)").unwrap());

/// Format a reference token.
pub fn ref_token(namespace: &str, path: &str) -> String {
    format!("ref({namespace}:{path})")
}

/// Reference token addressing a source file, relative to the source root.
///
/// Returns `None` for files outside the source root.
pub fn ref_token_for(mapper: &PathMapper, source: &Path) -> Option<String> {
    let rel = mapper.relative_source(source)?;
    let (namespace, path) = match rel.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => (
            super::paths::clean_path(parent),
            rel.file_stem()?.to_string_lossy().into_owned(),
        ),
        _ => (String::new(), rel.file_stem()?.to_string_lossy().into_owned()),
    };
    Some(ref_token(&namespace, &path))
}

/// Split `path#fragment`.
fn split_fragment(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (raw, None),
    }
}

/// Source file addressed by a namespace and path (no fragment).
pub fn source_of(mapper: &PathMapper, namespace: &str, path: &str) -> Option<PathBuf> {
    let rel = Path::new(namespace).join(path);
    mapper.find_source(&rel)
}

/// If `raw` is exactly one reference token, return its namespace and path.
pub fn parse_ref(raw: &str) -> Option<(&str, &str)> {
    let caps = REF_TOKEN.captures(raw)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != raw.len() {
        return None;
    }
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Rewrites reference tokens in one document for one output location.
pub struct RefResolver<'a> {
    mapper: &'a PathMapper,
    /// Source file whose output the document is written to.
    source: &'a Path,
    /// Identifier used in diagnostics.
    id: &'a str,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> RefResolver<'a> {
    pub fn new(
        mapper: &'a PathMapper,
        source: &'a Path,
        id: &'a str,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            mapper,
            source,
            id,
            diagnostics,
        }
    }

    /// Rewrite every token in the document and consume suppression flags.
    pub fn resolve(&mut self, document: &mut Value) {
        let mut armed = false;
        self.visit(document, &mut armed);
    }

    fn visit(&mut self, node: &mut Value, armed: &mut bool) {
        match node {
            Value::String(s) => {
                if let Some(rewritten) = self.rewrite(s, armed) {
                    *s = rewritten;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, armed);
                }
            }
            Value::Object(map) => {
                // The flag covers this subtree and is spent by its first miss.
                let mut local = map
                    .shift_remove(NO_REF_CHECK_KEY)
                    .is_some_and(|flag| flag != Value::Bool(false));
                let armed = if local { &mut local } else { armed };
                for value in map.values_mut() {
                    self.visit(value, armed);
                }
            }
            _ => {}
        }
    }

    fn rewrite(&mut self, s: &str, armed: &mut bool) -> Option<String> {
        if !s.contains("ref(") {
            return None;
        }
        let rewritten = REF_TOKEN.replace_all(s, |caps: &Captures| {
            let namespace = &caps[1];
            let raw = &caps[2];
            let (path, fragment) = split_fragment(raw);

            if path.is_empty() && fragment.is_some() {
                return raw.to_owned();
            }

            match source_of(self.mapper, namespace, path) {
                Some(target) => {
                    let mut out = self.mapper.output_ref(self.source, &target);
                    if let Some(fragment) = fragment {
                        out.push('#');
                        out.push_str(fragment);
                    }
                    out
                }
                None => {
                    if *armed {
                        *armed = false;
                    } else {
                        self.diagnostics.push(
                            DiagnosticKind::MissingReference,
                            self.id,
                            format!("unknown schema {} referenced", ref_token(namespace, raw)),
                        );
                    }
                    format!("{namespace}:{raw}")
                }
            }
        });
        Some(rewritten.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        mapper: PathMapper,
        source: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("types")).unwrap();
        fs::create_dir_all(src.join("powers")).unwrap();
        fs::write(src.join("types/vector.yml"), "type: object").unwrap();
        fs::write(src.join("powers/power.yml"), "type: object").unwrap();
        let mapper = PathMapper::new(&src, dir.path().join("out"));
        Fixture {
            source: src.join("powers/power.yml"),
            _dir: dir,
            mapper,
        }
    }

    #[test]
    fn test_parse_ref() {
        assert_eq!(parse_ref("ref(types:vector)"), Some(("types", "vector")));
        assert_eq!(parse_ref("$ref(:power)"), Some(("", "power")));
        assert_eq!(parse_ref("see ref(types:vector)"), None);
        assert_eq!(parse_ref("types/vector"), None);
    }

    #[test]
    fn test_ref_token_for() {
        let f = fixture();
        assert_eq!(
            ref_token_for(&f.mapper, &f.source).as_deref(),
            Some("ref(powers:power)")
        );
        let root_file = f.source.parent().unwrap().parent().unwrap().join("root.yml");
        assert_eq!(
            ref_token_for(&f.mapper, &root_file).as_deref(),
            Some("ref(:root)")
        );
    }

    #[test]
    fn test_resolves_relative_to_output() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let mut doc = json!({
            "$ref": "ref(types:vector)",
            "items": { "$ref": "$ref(types:vector#/definitions/x)" },
            "local": { "$ref": "ref(:#/definitions/y)" }
        });
        RefResolver::new(&f.mapper, &f.source, "powers/power", &mut diags).resolve(&mut doc);
        assert_eq!(
            doc,
            json!({
                "$ref": "../types/vector.json",
                "items": { "$ref": "../types/vector.json#/definitions/x" },
                "local": { "$ref": "#/definitions/y" }
            })
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_missing_reference_reports_once() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let mut doc = json!({ "$ref": "ref(types:missing)" });
        RefResolver::new(&f.mapper, &f.source, "powers/power", &mut diags).resolve(&mut doc);
        assert_eq!(doc, json!({ "$ref": "types:missing" }));
        assert_eq!(diags.count(DiagnosticKind::MissingReference), 1);
    }

    #[test]
    fn test_suppression_is_one_shot() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let mut doc = json!({
            "anyOf": [{
                "$NO_REF_CHECK": true,
                "a": "ref(types:first)",
                "b": "ref(types:second)"
            }],
            "c": "ref(types:third)"
        });
        RefResolver::new(&f.mapper, &f.source, "powers/power", &mut diags).resolve(&mut doc);
        let messages: Vec<_> = diags.iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("second")));
        assert!(messages.iter().any(|m| m.contains("third")));
        assert!(doc["anyOf"][0].get(NO_REF_CHECK_KEY).is_none());
    }

    #[test]
    fn test_plain_strings_untouched() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let mut doc = json!({ "description": "refers to nothing", "n": 3 });
        let before = doc.clone();
        RefResolver::new(&f.mapper, &f.source, "powers/power", &mut diags).resolve(&mut doc);
        assert_eq!(doc, before);
    }
}
