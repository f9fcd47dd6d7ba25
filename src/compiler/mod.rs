//! Template compilation engine.
//!
//! - **loader**: YAML/JSON templates → `serde_json::Value`
//! - **walker**: read-only directive discovery with context snapshots
//! - **directive**: `$IMPORT` vocabulary and argument parsing
//! - **session**: cache, directive execution, output
//! - **references**: `ref(ns:path)` tokens and integrity checks
//!
//! # Build Flow
//!
//! ```text
//! collect_templates() ──► BuildSession::compile_batch() ──► schemas/**/*.json
//!                                  │
//!                                  ├── discover() ──► DeferredCall[]
//!                                  └── execute ────► compile(imported) …
//! ```

pub mod cache;
pub mod diagnostic;
pub mod directive;
pub mod docs;
pub mod error;
pub mod loader;
pub mod paths;
pub mod references;
pub mod session;
pub mod template;
pub mod tokens;
pub mod walker;

pub use diagnostic::Diagnostics;
pub use error::{BuildError, BuildResult};
pub use paths::PathMapper;
pub use session::{BatchReport, BuildSession};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect every template file below `dir`, sorted by path.
pub fn collect_templates(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .filter(|path| paths::is_template(path))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_templates() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/z.yml"), "").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files = collect_templates(dir.path());
        assert_eq!(
            files,
            vec![dir.path().join("a.json"), dir.path().join("b/z.yml")]
        );
    }

    #[test]
    fn test_collect_templates_missing_dir() {
        assert!(collect_templates(Path::new("/nonexistent/schemac/src")).is_empty());
    }
}
