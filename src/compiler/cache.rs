//! Per-generation compile cache and import dependency graph.
//!
//! The cache lives for one build generation (one batch). The dependency graph
//! outlives generations so the watch loop can find every importer of a changed
//! file.

use super::error::{BuildError, BuildResult};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Arc,
};

/// A compiled document, before reference tokens are resolved for output.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    pub id: String,
    pub source: PathBuf,
    pub document: Value,
    /// `false` for internal-only documents.
    pub export: bool,
}

#[derive(Debug)]
enum CacheEntry {
    InProgress,
    Done(Arc<CompiledSchema>),
}

#[derive(Debug, Default)]
pub struct CompileCache {
    entries: FxHashMap<PathBuf, CacheEntry>,
    /// Documents compiled in this generation.
    compiled: usize,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `path`, or mark it as in progress.
    ///
    /// Returns the cached document if it is already compiled. Reaching a path
    /// that is still being compiled means it imports itself.
    pub fn begin(&mut self, path: &Path, id: &str) -> BuildResult<Option<Arc<CompiledSchema>>> {
        match self.entries.get(path) {
            Some(CacheEntry::Done(schema)) => Ok(Some(Arc::clone(schema))),
            Some(CacheEntry::InProgress) => Err(BuildError::ImportCycle(id.to_owned())),
            None => {
                self.entries.insert(path.to_path_buf(), CacheEntry::InProgress);
                Ok(None)
            }
        }
    }

    /// Store the result of a compile started with [`CompileCache::begin`].
    pub fn finish(&mut self, schema: CompiledSchema) -> Arc<CompiledSchema> {
        let schema = Arc::new(schema);
        self.entries
            .insert(schema.source.clone(), CacheEntry::Done(Arc::clone(&schema)));
        self.compiled += 1;
        schema
    }

    /// Drop the in-progress marker of a failed compile.
    pub fn abandon(&mut self, path: &Path) {
        if matches!(self.entries.get(path), Some(CacheEntry::InProgress)) {
            self.entries.remove(path);
        }
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<Arc<CompiledSchema>> {
        match self.entries.get(path) {
            Some(CacheEntry::Done(schema)) => Some(Arc::clone(schema)),
            _ => None,
        }
    }

    pub fn compiled(&self) -> usize {
        self.compiled
    }

    /// Start a new generation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.compiled = 0;
    }
}

/// Reverse import edges: imported file → files importing it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: FxHashMap<PathBuf, FxHashSet<PathBuf>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, importer: &Path, imported: &Path) {
        if importer == imported {
            return;
        }
        self.dependents
            .entry(imported.to_path_buf())
            .or_default()
            .insert(importer.to_path_buf());
    }

    /// Remove every edge from `importer` before it is recompiled.
    pub fn forget(&mut self, importer: &Path) {
        self.dependents.retain(|_, importers| {
            importers.remove(importer);
            !importers.is_empty()
        });
    }

    /// Remove a deleted file entirely.
    pub fn remove(&mut self, path: &Path) {
        self.forget(path);
        self.dependents.remove(path);
    }

    #[cfg(test)]
    pub fn dependents(&self, path: &Path) -> Option<&FxHashSet<PathBuf>> {
        self.dependents.get(path)
    }

    /// Every file that imports one of `changed`, directly or transitively.
    ///
    /// The changed files themselves are not included. Output is sorted.
    pub fn affected(&self, changed: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen: FxHashSet<&Path> = changed.iter().map(PathBuf::as_path).collect();
        let mut queue: VecDeque<&Path> = changed.iter().map(PathBuf::as_path).collect();
        let mut affected = Vec::new();

        while let Some(path) = queue.pop_front() {
            for importer in self.dependents.get(path).into_iter().flatten() {
                if seen.insert(importer) {
                    affected.push(importer.clone());
                    queue.push_back(importer);
                }
            }
        }

        affected.sort();
        affected
    }
}
