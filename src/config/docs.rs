//! `[docs]` section configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[docs]` section in schemac.toml - local documentation pages for
/// `$docsUrl` correlation.
///
/// # Example
/// ```toml
/// [docs]
/// root = "docs"
/// base_url = "https://docs.example/en/latest/"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// Directory of markdown pages. Without one, correlation is skipped.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// URL prefix stripped from `$docsUrl` before mapping it under `root`.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::super::SchemaConfig;
    use std::path::PathBuf;

    #[test]
    fn test_docs_config() {
        let config: SchemaConfig = toml::from_str(
            r#"
            [docs]
            root = "docs"
            base_url = "https://docs.example/en/latest/"
        "#,
        )
        .unwrap();
        assert_eq!(config.docs.root, Some(PathBuf::from("docs")));
        assert_eq!(
            config.docs.base_url.as_deref(),
            Some("https://docs.example/en/latest/")
        );
    }

    #[test]
    fn test_unknown_field_rejection() {
        let result: Result<SchemaConfig, _> = toml::from_str("[docs]\nurl = \"x\"\n");
        assert!(result.is_err());
    }
}
