//! File category classification for watch mode.
//!
//! | Category   | Watch action                          | Example Files          |
//! |------------|---------------------------------------|------------------------|
//! | Template   | Rebuild file and its importers        | `src/schemas/**/*.yml` |
//! | Registry   | Reload registry, full rebuild         | `data/registry.yml`    |
//! | Unknown    | Ignored                               | Everything else        |

use crate::{compiler::paths::is_template, config::SchemaConfig};
use std::path::{Path, PathBuf};

pub use crate::config::normalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// Template below the source root
    Template,
    /// The configured registry file
    Registry,
    /// Anything else, including editor artifacts
    Unknown,
}

impl FileCategory {
    /// Short name used in logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Registry => "registry",
            Self::Unknown => "unknown",
        }
    }

    /// Path to watch for this category, if configured.
    pub fn path(self, config: &SchemaConfig) -> Option<PathBuf> {
        match self {
            Self::Template => Some(config.build.src.clone()),
            Self::Registry => config.registry.path.clone(),
            Self::Unknown => None,
        }
    }

    /// Returns true if this category represents a directory (vs a single file)
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::Template)
    }
}

/// Categorize a changed path.
///
/// Deleted files cannot be canonicalized, so the comparison falls back to
/// the absolute path as given.
pub fn categorize_path(path: &Path, config: &SchemaConfig) -> FileCategory {
    if is_temp_file(path) {
        return FileCategory::Unknown;
    }
    let path = normalize_path(path);

    if config.registry.path.as_deref() == Some(path.as_path()) {
        FileCategory::Registry
    } else if path.starts_with(&config.build.src) && is_template(&path) {
        FileCategory::Template
    } else {
        FileCategory::Unknown
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> SchemaConfig {
        let root = normalize_path(dir.path());
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("registry.yml"), "a: []\n").unwrap();

        let mut config = SchemaConfig::default();
        config.build.src = root.join("src");
        config.build.out = root.join("out");
        config.registry.path = Some(root.join("registry.yml"));
        config
    }

    #[test]
    fn test_category_name() {
        assert_eq!(FileCategory::Template.name(), "template");
        assert_eq!(FileCategory::Registry.name(), "registry");
        assert_eq!(FileCategory::Unknown.name(), "unknown");
    }

    #[test]
    fn test_is_directory() {
        assert!(FileCategory::Template.is_directory());
        assert!(!FileCategory::Registry.is_directory());
    }

    #[test]
    fn test_categorize_path() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let src = &config.build.src;

        assert_eq!(categorize_path(&src.join("a/b.yml"), &config), FileCategory::Template);
        assert_eq!(categorize_path(&src.join("a/b.json"), &config), FileCategory::Template);
        assert_eq!(categorize_path(&src.join("a/notes.md"), &config), FileCategory::Unknown);
        assert_eq!(categorize_path(&src.join("a/.b.yml.swp"), &config), FileCategory::Unknown);
        assert_eq!(
            categorize_path(config.registry.path.as_ref().unwrap(), &config),
            FileCategory::Registry
        );
        assert_eq!(
            categorize_path(&config.build.out.join("a.json"), &config),
            FileCategory::Unknown
        );
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("a.yml~")));
        assert!(is_temp_file(Path::new(".a.yml.swp")));
        assert!(is_temp_file(Path::new("a.bak")));
        assert!(!is_temp_file(Path::new("a.yml")));
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = normalize_path(Path::new("relative/missing"));
        assert!(path.is_absolute());
        assert!(path.ends_with("relative/missing"));
    }
}
