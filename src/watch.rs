//! File system watcher and incremental build loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────┐    ┌──────────────┐    ┌────────────────────┐  │
//! │  │ notify   │───▶│ intake()     │───▶│ delete_queue       │  │
//! │  │ events   │    │ (enqueue     │    │ build_queue        │  │
//! │  └──────────┘    │  only)       │    └─────────┬──────────┘  │
//! │                  └──────────────┘              │             │
//! │  ┌──────────┐                                  ▼             │
//! │  │ interval │─────────────────────────▶ BuildLoop::tick()    │
//! │  │ timer    │                          one deletion, or one  │
//! │  └──────────┘                          batch per tick        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A batch that fails poisons the next batch: once anything is queued again,
//! the whole source tree is rebuilt so stale output cannot survive. An idle
//! tick never builds, poisoned or not.

use crate::{
    build::{load_registry, source_files, summarize},
    compiler::{BatchReport, BuildSession},
    config::SchemaConfig,
    data::registry::Registry,
    log,
    utils::category::{FileCategory, categorize_path, normalize_path},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::{
    collections::VecDeque,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::RecvTimeoutError,
    },
    time::Instant,
};

/// Format path as relative without extension for log display.
///
/// `/proj/src/schemas/actions/damage.yml` → `src/schemas/actions/damage`
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .with_extension("")
        .display()
        .to_string()
}

// =============================================================================
// Build Loop
// =============================================================================

/// What one tick did.
#[derive(Debug)]
pub enum Tick {
    /// A batch is still running.
    Busy,
    /// Nothing queued.
    Idle,
    /// Removed the output of one deleted source.
    Deleted(PathBuf),
    Built(BatchReport),
}

/// Queues fed by watch events and drained one tick at a time.
pub struct BuildLoop<'a> {
    session: BuildSession,
    config: &'a SchemaConfig,
    /// Deleted sources whose output still has to go.
    delete_queue: VecDeque<PathBuf>,
    /// Sources to rebuild; duplicates are harmless within one generation.
    build_queue: Vec<PathBuf>,
    /// The registry file changed since the last tick.
    registry_changed: bool,
    /// The previous batch failed; the next one rebuilds everything.
    last_failed: bool,
    /// The registry was reloaded; the next tick rebuilds everything.
    force_full: bool,
    working: bool,
}

impl<'a> BuildLoop<'a> {
    pub fn new(session: BuildSession, config: &'a SchemaConfig) -> Self {
        Self {
            session,
            config,
            delete_queue: VecDeque::new(),
            build_queue: Vec::new(),
            registry_changed: false,
            last_failed: false,
            force_full: false,
            working: false,
        }
    }

    /// Mark the loop as poisoned, e.g. after a failed initial build.
    pub fn mark_failed(&mut self) {
        self.last_failed = true;
    }

    #[cfg(test)]
    pub const fn is_poisoned(&self) -> bool {
        self.last_failed
    }

    // ------------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------------

    /// Enqueue the paths of one watch event. Never compiles.
    pub fn intake(&mut self, event: &Event) {
        let removed = matches!(event.kind, EventKind::Remove(_));
        for path in &event.paths {
            if removed || !path.exists() {
                self.enqueue_removal(path);
            } else {
                self.enqueue_change(path);
            }
        }
    }

    pub fn enqueue_change(&mut self, path: &Path) {
        match categorize_path(path, self.config) {
            FileCategory::Template => self.build_queue.push(normalize_path(path)),
            FileCategory::Registry => self.registry_changed = true,
            FileCategory::Unknown => {}
        }
    }

    pub fn enqueue_removal(&mut self, path: &Path) {
        match categorize_path(path, self.config) {
            FileCategory::Template => self.delete_queue.push_back(normalize_path(path)),
            FileCategory::Registry => self.registry_changed = true,
            FileCategory::Unknown => {}
        }
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Run one step: a single deletion if any is pending, else one batch.
    pub fn tick(&mut self) -> Tick {
        if self.working {
            return Tick::Busy;
        }

        if let Some(source) = self.delete_queue.pop_front() {
            self.delete_output(&source);
            return Tick::Deleted(source);
        }

        if self.registry_changed {
            self.registry_changed = false;
            self.reload_registry();
        }

        if self.build_queue.is_empty() && !self.force_full {
            return Tick::Idle;
        }

        self.working = true;
        let report = self.run_batch();
        self.working = false;
        Tick::Built(report)
    }

    fn run_batch(&mut self) -> BatchReport {
        let root = self.config.get_root();
        let changed = std::mem::take(&mut self.build_queue);

        let batch = if self.force_full {
            self.force_full = false;
            self.last_failed = false;
            log!("watch"; "registry changed, rebuilding everything");
            source_files(self.config)
        } else if self.last_failed {
            self.last_failed = false;
            log!("watch"; "previous build failed, rebuilding everything");
            source_files(self.config)
        } else {
            let batch = self.session.with_dependents(&changed);
            let names: Vec<_> = changed.iter().map(|p| rel_path(p, root)).collect();
            if batch.len() > changed.len() {
                log!("watch"; "{} changed, rebuilding {} files", names.join(", "), batch.len());
            } else {
                log!("watch"; "{} changed", names.join(", "));
            }
            batch
        };

        let report = self.session.compile_batch(&batch);
        summarize(&mut self.session, &report);
        if !report.is_ok() {
            self.last_failed = true;
            log!("watch"; "build failed, next change rebuilds everything");
        }
        report
    }

    fn delete_output(&mut self, source: &Path) {
        let root = self.config.get_root();
        let importers = self.session.graph().affected(&[source.to_path_buf()]);
        self.build_queue.extend(importers.into_iter().filter(|p| p.is_file()));
        self.session.forget_source(source);

        let output = self.session.mapper().output_for(source);
        match fs::remove_file(&output) {
            Ok(()) => log!("watch"; "deleted {}", rel_path(&output, root)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log!("error"; "failed to delete {}: {e}", rel_path(&output, root)),
        }
    }

    /// Reload the registry; any outcome forces a full rebuild.
    fn reload_registry(&mut self) {
        match load_registry(self.config) {
            Ok(registry) => self
                .session
                .set_registry(registry.map(|r| Box::new(r) as Box<dyn Registry>)),
            Err(e) => log!("error"; "{e:#}"),
        }
        self.force_full = true;
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

const WATCH_CATEGORIES: &[FileCategory] = &[FileCategory::Template, FileCategory::Registry];

fn setup_watchers(watcher: &mut impl Watcher, config: &SchemaConfig) -> Result<()> {
    let root = config.get_root();
    for &cat in WATCH_CATEGORIES {
        if let Some(path) = cat.path(config)
            && path.exists()
        {
            let mode = if cat.is_directory() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher
                .watch(&path, mode)
                .with_context(|| format!("Failed to watch {}: {}", cat.name(), path.display()))?;
            log!("watch"; "{}: {}", cat.name(), path.strip_prefix(root).unwrap_or(&path).display());
        }
    }
    Ok(())
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Watch the source tree and rebuild on change until Ctrl+C.
pub fn watch_blocking(mut build_loop: BuildLoop<'_>, config: &SchemaConfig) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || stop_for_signal.store(true, Ordering::SeqCst))
        .context("Failed to set Ctrl+C handler")?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, config)?;

    let interval = config.watch.interval();
    let debounce = config.watch.debounce();
    let mut last_event: Option<Instant> = None;
    let mut last_tick = Instant::now();

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(interval) {
            Ok(Ok(event)) if is_relevant(&event) => {
                build_loop.intake(&event);
                last_event = Some(Instant::now());
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }

        let quiet = last_event.is_none_or(|t| t.elapsed() >= debounce);
        if quiet && last_tick.elapsed() >= interval {
            last_tick = Instant::now();
            build_loop.tick();
        }
    }

    log!("watch"; "stopped");
    Ok(())
}
