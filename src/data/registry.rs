//! Registry collaborator: named lists of item identifiers.
//!
//! The file form is a YAML or JSON mapping of key → list of strings:
//!
//! ```yaml
//! block: [minecraft:stone, minecraft:dirt]
//! item:
//!   - minecraft:apple
//! ```

use crate::compiler::{
    error::{BuildError, BuildResult},
    loader::load_template,
};
use rustc_hash::FxHashMap;
use std::path::Path;

/// Keyed lookup of ordered string lists.
pub trait Registry {
    fn lookup(&self, key: &str) -> Option<&[String]>;
}

/// Registry backed by an in-memory map, usually loaded from a file.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    entries: FxHashMap<String, Vec<String>>,
}

impl FileRegistry {
    pub fn load(path: &Path) -> BuildResult<Self> {
        let value = load_template(path)?;
        let entries = serde_json::from_value(value).map_err(|e| BuildError::Parse {
            path: path.to_path_buf(),
            reason: format!("registry must map keys to string lists: {e}"),
        })?;
        Ok(Self { entries })
    }

    #[cfg(test)]
    pub fn from_entries<K, I, S>(entries: impl IntoIterator<Item = (K, I)>) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, items)| (k.into(), items.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Registry for FileRegistry {
    fn lookup(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }
}
