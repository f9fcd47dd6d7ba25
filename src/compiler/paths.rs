//! Source/output path mapping.
//!
//! The output tree mirrors the source tree 1:1:
//!
//! ```text
//! src/schemas/actions/damage.yml   →   schemas/actions/damage.json
//! src/schemas/power.json           →   schemas/power.json
//! ```
//!
//! All paths handed to a [`PathMapper`] are absolute; config normalizes them
//! before the build session is created.

use std::path::{Component, Path, PathBuf};

/// Extensions accepted as template sources, in lookup order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Extension of every emitted document.
pub const OUTPUT_EXTENSION: &str = "json";

/// Render a path with forward slashes regardless of platform.
pub fn clean_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Check whether a path looks like a template source file.
pub fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

/// Lexically compute `to` relative to the directory `from_dir`.
///
/// Both paths must be absolute (or share the same relative base).
///
/// `/out/a/b` + `/out/c/d.json` → `../../c/d.json`
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from_dir.components().collect();
    let target: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    rel
}

/// Lexically resolve `.` and `..` components without touching the file system.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Maps source paths to their mirrored output paths and identifiers.
#[derive(Debug, Clone)]
pub struct PathMapper {
    src: PathBuf,
    out: PathBuf,
}

impl PathMapper {
    pub fn new(src: impl Into<PathBuf>, out: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            out: out.into(),
        }
    }

    /// Path of `source` relative to the source root, if it lives inside it.
    pub fn relative_source<'a>(&self, source: &'a Path) -> Option<&'a Path> {
        source.strip_prefix(&self.src).ok()
    }

    /// Mirrored output location of a source file, with the extension normalized.
    ///
    /// Sources outside the source root keep their own relative structure under
    /// the output root (by file name only).
    pub fn output_for(&self, source: &Path) -> PathBuf {
        let rel = self
            .relative_source(source)
            .map(Path::to_path_buf)
            .or_else(|| source.file_name().map(PathBuf::from))
            .unwrap_or_default();
        self.out.join(rel).with_extension(OUTPUT_EXTENSION)
    }

    /// Canonical identifier of a compiled document.
    ///
    /// `src/schemas/actions/damage.yml` → `actions/damage`
    pub fn schema_id(&self, source: &Path) -> String {
        let rel = self.relative_source(source).unwrap_or(source);
        clean_path(&rel.with_extension(""))
    }

    /// Find the existing source file for an extension-less path below the
    /// source root, trying each template extension in order.
    ///
    /// A path that already carries a template extension is only checked as-is.
    pub fn find_source(&self, rel: &Path) -> Option<PathBuf> {
        let base = normalize_lexically(&self.src.join(rel));
        if !base.starts_with(&self.src) {
            return None;
        }
        if is_template(&base) {
            return base.is_file().then_some(base);
        }
        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| {
                let mut candidate = base.clone().into_os_string();
                candidate.push(".");
                candidate.push(ext);
                PathBuf::from(candidate)
            })
            .find(|candidate| candidate.is_file())
    }

    /// Resolve a directory argument relative to the source root.
    ///
    /// Returns `None` when the result escapes the source root.
    pub fn source_dir(&self, rel: &str) -> Option<PathBuf> {
        let rel = rel.trim_start_matches("./").trim_start_matches('/');
        let dir = normalize_lexically(&self.src.join(rel));
        dir.starts_with(&self.src).then_some(dir)
    }

    /// Relative reference from the output file of `from_source` to the output
    /// file of `to_source`.
    pub fn output_ref(&self, from_source: &Path, to_source: &Path) -> String {
        let from = self.output_for(from_source);
        let to = self.output_for(to_source);
        let from_dir = from.parent().unwrap_or(&self.out);
        clean_path(&relative_path(from_dir, &to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("a/b/c.json")), "a/b/c.json");
        assert_eq!(clean_path(Path::new(r"a\b\c.json")), "a/b/c.json");
    }

    #[test]
    fn test_is_template() {
        assert!(is_template(Path::new("a.yml")));
        assert!(is_template(Path::new("a.yaml")));
        assert!(is_template(Path::new("a.json")));
        assert!(!is_template(Path::new("a.md")));
        assert!(!is_template(Path::new("a")));
    }

    #[test]
    fn test_relative_path_sibling_dirs() {
        let rel = relative_path(Path::new("/out/a/b"), Path::new("/out/c/d.json"));
        assert_eq!(clean_path(&rel), "../../c/d.json");
    }

    #[test]
    fn test_relative_path_same_dir() {
        let rel = relative_path(Path::new("/out/a"), Path::new("/out/a/d.json"));
        assert_eq!(clean_path(&rel), "d.json");
    }

    #[test]
    fn test_relative_path_child_dir() {
        let rel = relative_path(Path::new("/out"), Path::new("/out/actions/d.json"));
        assert_eq!(clean_path(&rel), "actions/d.json");
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/src/a/../b/./c")),
            PathBuf::from("/src/b/c")
        );
    }

    #[test]
    fn test_output_for_mirrors_structure() {
        let mapper = PathMapper::new("/p/src/schemas", "/p/schemas");
        assert_eq!(
            mapper.output_for(Path::new("/p/src/schemas/actions/damage.yml")),
            PathBuf::from("/p/schemas/actions/damage.json")
        );
        assert_eq!(
            mapper.output_for(Path::new("/p/src/schemas/power.yaml")),
            PathBuf::from("/p/schemas/power.json")
        );
        assert_eq!(
            mapper.output_for(Path::new("/p/src/schemas/raw.json")),
            PathBuf::from("/p/schemas/raw.json")
        );
    }

    #[test]
    fn test_schema_id() {
        let mapper = PathMapper::new("/p/src", "/p/out");
        assert_eq!(mapper.schema_id(Path::new("/p/src/actions/damage.yml")), "actions/damage");
        assert_eq!(mapper.schema_id(Path::new("/p/src/power.json")), "power");
    }

    #[test]
    fn test_output_ref_between_files() {
        let mapper = PathMapper::new("/p/src", "/p/out");
        let rel = mapper.output_ref(
            Path::new("/p/src/powers/power.yml"),
            Path::new("/p/src/actions/damage.yml"),
        );
        assert_eq!(rel, "../actions/damage.json");
    }

    #[test]
    fn test_find_source_tries_extensions() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("types")).unwrap();
        fs::write(src.join("types/vector.yaml"), "type: object").unwrap();

        let mapper = PathMapper::new(&src, dir.path().join("out"));
        assert_eq!(
            mapper.find_source(Path::new("types/vector")),
            Some(src.join("types/vector.yaml"))
        );
        assert_eq!(mapper.find_source(Path::new("types/missing")), None);
        assert_eq!(mapper.find_source(Path::new("../escape")), None);
    }

    #[test]
    fn test_source_dir_rejects_escape() {
        let mapper = PathMapper::new("/p/src", "/p/out");
        assert_eq!(mapper.source_dir("actions"), Some(PathBuf::from("/p/src/actions")));
        assert_eq!(mapper.source_dir("./actions/"), Some(PathBuf::from("/p/src/actions")));
        assert_eq!(mapper.source_dir("../elsewhere"), None);
    }
}
