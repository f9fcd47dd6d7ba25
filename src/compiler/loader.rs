//! Template loading.
//!
//! Reads one YAML or JSON template into a `serde_json::Value` tree. YAML is
//! parsed with `serde_yaml` and converted node by node so mapping order is
//! preserved and non-string keys are reported instead of silently mangled.

use super::error::{BuildError, BuildResult};
use serde_json::{Map, Number, Value};
use std::{fs, path::Path};

/// Template source format, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Yaml,
    Json,
}

impl TemplateFormat {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Read and parse a template file.
///
/// An empty document yields an empty object.
pub fn load_template(path: &Path) -> BuildResult<Value> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    parse_template(&content, TemplateFormat::of(path)).map_err(|reason| BuildError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse template text in the given format.
pub fn parse_template(content: &str, format: TemplateFormat) -> Result<Value, String> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = match format {
        TemplateFormat::Json => {
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?
        }
        TemplateFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {e}"))?;
            yaml_to_json(&yaml)?
        }
    };

    Ok(match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    })
}

/// Convert a `serde_yaml::Value` into the equivalent JSON tree.
///
/// Tags are dropped, numeric and boolean keys are stringified.
pub fn yaml_to_json(yaml: &serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        Yaml::String(s) => Ok(Value::String(s.clone())),
        Yaml::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                let key = match k {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key: {other:?}")),
                };
                map.insert(key, yaml_to_json(v)?);
            }
            Ok(Value::Object(map))
        }
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_of() {
        assert_eq!(TemplateFormat::of(Path::new("a.json")), TemplateFormat::Json);
        assert_eq!(TemplateFormat::of(Path::new("a.yml")), TemplateFormat::Yaml);
        assert_eq!(TemplateFormat::of(Path::new("a.yaml")), TemplateFormat::Yaml);
    }

    #[test]
    fn test_yaml_preserves_key_order() {
        let value = parse_template("b: 1\na: 2\nc: 3\n", TemplateFormat::Yaml).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_yaml_scalars() {
        let value = parse_template(
            "int: 3\nfloat: 1.5\nflag: true\nnone: ~\nlist: [a, 1]\n1: numeric key\n",
            TemplateFormat::Yaml,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "int": 3,
                "float": 1.5,
                "flag": true,
                "none": null,
                "list": ["a", 1],
                "1": "numeric key"
            })
        );
    }

    #[test]
    fn test_empty_document_is_empty_object() {
        assert_eq!(parse_template("", TemplateFormat::Yaml).unwrap(), json!({}));
        assert_eq!(parse_template("   \n", TemplateFormat::Json).unwrap(), json!({}));
        assert_eq!(parse_template("~", TemplateFormat::Yaml).unwrap(), json!({}));
    }

    #[test]
    fn test_invalid_json_reports_reason() {
        let err = parse_template("{ nope", TemplateFormat::Json).unwrap_err();
        assert!(err.contains("invalid JSON"));
    }

    #[test]
    fn test_load_template_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.yml");
        std::fs::write(&path, "type: object\ntitle: A\n").unwrap();
        assert_eq!(
            load_template(&path).unwrap(),
            json!({ "type": "object", "title": "A" })
        );

        let missing = load_template(&dir.path().join("missing.yml"));
        assert!(matches!(missing, Err(BuildError::Io { .. })));
    }
}
