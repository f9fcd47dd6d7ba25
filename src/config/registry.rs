//! `[registry]` section configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[registry]` section in schemac.toml.
///
/// # Example
/// ```toml
/// [registry]
/// path = "data/registry.yml"   # key → list of identifiers
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registry file (YAML or JSON). Without one, registry imports fail.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
