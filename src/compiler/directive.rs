//! Directive vocabulary and `$IMPORT` argument parsing.
//!
//! `$IMPORT` takes one directive object or an array of them. Each object names
//! its family with a `type` (or legacy `format`) discriminator; unknown names
//! are rejected here so a typo never silently produces an empty schema.
//!
//! | `type`                                  | legacy `format`      | effect                                 |
//! |-----------------------------------------|----------------------|----------------------------------------|
//! | `import_as_conditional_array`           | `allOfIfThen`        | if/then branches with `$ref` to variant |
//! | `import_contents_as_conditional_array`  | `allOfIfThenUnique`  | if/then branches with inlined variant   |
//! | `import_minecraft_registry`             |                      | one clone per registry item             |
//! | `import_files_into_array`               |                      | one clone per file in a directory       |
//! | `include`                               | `include`            | compile for side effect only            |

use super::error::{BuildError, BuildResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Import directive key.
pub const IMPORT_KEY: &str = "$IMPORT";
/// Root flag: compile and cache, but never write to the output tree.
pub const DONT_EXPORT_KEY: &str = "$DONT_EXPORT";
/// Root list of property names exempt from documentation checks.
pub const IGNORED_FIELDS_KEY: &str = "$IGNORED_FIELDS";
/// One-shot suppression of the next missing-reference diagnostic.
pub const NO_REF_CHECK_KEY: &str = "$NO_REF_CHECK";
/// Documentation page of a template (kept in output).
pub const DOCS_URL_KEY: &str = "$docsUrl";

/// Fields whose string values are templated with nearest-context tokens.
pub const TEMPLATED_KEYS: &[&str] = &["description", "markdownDescription", "const", "enum"];

/// Directive keys the engine understands. Everything else shaped like a
/// directive is reported and stripped.
pub const KNOWN_DIRECTIVES: &[&str] = &[
    IMPORT_KEY,
    DONT_EXPORT_KEY,
    IGNORED_FIELDS_KEY,
    NO_REF_CHECK_KEY,
];

/// `$` followed by one or more upper-case letters, digits or underscores.
pub fn looks_like_directive(key: &str) -> bool {
    key.strip_prefix('$').is_some_and(|rest| {
        !rest.is_empty()
            && rest.starts_with(|c: char| c.is_ascii_uppercase())
            && rest
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    })
}

// ============================================================================
// Arguments
// ============================================================================

/// Shared arguments of the two conditional-array families.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalArgs {
    pub path: String,
    pub condition: Value,
    #[serde(default)]
    pub replace: Map<String, Value>,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default, alias = "then_additions")]
    pub then_additions: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryArgs {
    pub registry_key: String,
    pub output_key: String,
    pub schema_structure: Value,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesArgs {
    pub path: String,
    pub output_key: String,
    pub schema_structure: Value,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncludeArgs {
    pub path: String,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// One parsed `$IMPORT` entry.
#[derive(Debug, Clone)]
pub enum ImportDirective {
    /// Branches referencing each variant's compiled output.
    Conditional(ConditionalArgs),
    /// Branches inlining each variant's compiled document.
    ConditionalContents(ConditionalArgs),
    /// One structure clone per item of a registry list.
    Registry(RegistryArgs),
    /// One structure clone per file of a directory.
    FilesIntoArray(FilesArgs),
    /// Compile every file of a directory for its side effect.
    Include(IncludeArgs),
}

impl ImportDirective {
    /// Parse the value of a `$IMPORT` key (object or array of objects).
    pub fn parse_all(args: &Value, file: &str) -> BuildResult<Vec<Self>> {
        match args {
            Value::Array(items) => items.iter().map(|item| Self::parse(item, file)).collect(),
            other => Ok(vec![Self::parse(other, file)?]),
        }
    }

    /// Parse one directive object.
    pub fn parse(args: &Value, file: &str) -> BuildResult<Self> {
        let Value::Object(map) = args else {
            return Err(BuildError::InvalidArgument {
                file: file.to_owned(),
                reason: format!("expected an object, found `{args}`"),
            });
        };

        let kind = map
            .get("type")
            .or_else(|| map.get("format"))
            .and_then(Value::as_str)
            .ok_or_else(|| BuildError::MissingArgument {
                file: file.to_owned(),
                arg: "type",
            })?;

        match kind {
            "import_as_conditional_array" | "allOfIfThen" => {
                Ok(Self::Conditional(deserialize(args, file, &["path", "condition"])?))
            }
            "import_contents_as_conditional_array" | "allOfIfThenUnique" => Ok(
                Self::ConditionalContents(deserialize(args, file, &["path", "condition"])?),
            ),
            "import_minecraft_registry" => Ok(Self::Registry(deserialize(
                args,
                file,
                &["registry_key", "output_key", "schema_structure"],
            )?)),
            "import_files_into_array" => Ok(Self::FilesIntoArray(deserialize(
                args,
                file,
                &["path", "output_key", "schema_structure"],
            )?)),
            "include" => Ok(Self::Include(deserialize(args, file, &["path"])?)),
            other => Err(BuildError::UnknownDirective {
                file: file.to_owned(),
                kind: other.to_owned(),
            }),
        }
    }
}

/// Check required arguments by name first, so the error names the argument,
/// then deserialize the typed argument struct.
fn deserialize<T: for<'de> Deserialize<'de>>(
    args: &Value,
    file: &str,
    required: &[&'static str],
) -> BuildResult<T> {
    for &arg in required {
        if args.get(arg).is_none_or(Value::is_null) {
            return Err(BuildError::MissingArgument {
                file: file.to_owned(),
                arg,
            });
        }
    }
    T::deserialize(args).map_err(|e| BuildError::InvalidArgument {
        file: file.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_looks_like_directive() {
        assert!(looks_like_directive("$IMPORT"));
        assert!(looks_like_directive("$DONT_EXPORT"));
        assert!(looks_like_directive("$INCLUDE2"));
        assert!(!looks_like_directive("$ref"));
        assert!(!looks_like_directive("$schema"));
        assert!(!looks_like_directive("$docsUrl"));
        assert!(!looks_like_directive("$"));
        assert!(!looks_like_directive("IMPORT"));
        assert!(!looks_like_directive("$_X"));
    }

    #[test]
    fn test_parse_conditional_with_legacy_format() {
        let args = json!({
            "path": "actions",
            "format": "allOfIfThen",
            "condition": { "properties": { "type": { "const": "$schemaName" } } },
            "exclude": ["nothing"]
        });
        let parsed = ImportDirective::parse(&args, "power").unwrap();
        match parsed {
            ImportDirective::Conditional(a) => {
                assert_eq!(a.path, "actions");
                assert_eq!(a.exclude, vec!["nothing"]);
                assert!(a.replace.is_empty());
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn test_parse_contents_then_additions() {
        let args = json!({
            "path": "conditions",
            "type": "import_contents_as_conditional_array",
            "condition": {},
            "thenAdditions": { "required": ["type"] },
            "variables": { "kind": "entity" }
        });
        match ImportDirective::parse(&args, "x").unwrap() {
            ImportDirective::ConditionalContents(a) => {
                assert_eq!(a.then_additions.get("required"), Some(&json!(["type"])));
                assert_eq!(a.variables.get("kind"), Some(&json!("entity")));
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn test_parse_registry() {
        let args = json!({
            "type": "import_minecraft_registry",
            "output_key": "anyOf",
            "registry_key": "X",
            "schema_structure": { "const": "$item" }
        });
        assert!(matches!(
            ImportDirective::parse(&args, "x").unwrap(),
            ImportDirective::Registry(RegistryArgs { ref registry_key, .. }) if registry_key == "X"
        ));
    }

    #[test]
    fn test_parse_all_array() {
        let args = json!([
            { "type": "include", "path": "a" },
            { "format": "include", "path": "b" }
        ]);
        let parsed = ImportDirective::parse_all(&args, "x").unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|d| matches!(d, ImportDirective::Include(_))));
    }

    #[test]
    fn test_unknown_discriminator_is_fatal() {
        let args = json!({ "type": "allOfIfThne", "path": "a" });
        let err = ImportDirective::parse(&args, "power").unwrap_err();
        assert!(matches!(err, BuildError::UnknownDirective { ref kind, .. } if kind == "allOfIfThne"));
    }

    #[test]
    fn test_missing_discriminator() {
        let err = ImportDirective::parse(&json!({ "path": "a" }), "power").unwrap_err();
        assert!(matches!(err, BuildError::MissingArgument { arg: "type", .. }));
    }

    #[test]
    fn test_missing_required_argument() {
        let args = json!({ "type": "allOfIfThen", "path": "a" });
        let err = ImportDirective::parse(&args, "power").unwrap_err();
        assert!(matches!(err, BuildError::MissingArgument { arg: "condition", .. }));

        let args = json!({ "type": "include" });
        let err = ImportDirective::parse(&args, "power").unwrap_err();
        assert!(matches!(err, BuildError::MissingArgument { arg: "path", .. }));
    }

    #[test]
    fn test_non_object_directive() {
        let err = ImportDirective::parse(&json!("include"), "power").unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument { .. }));
    }
}
