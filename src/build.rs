//! Full-tree build orchestration.
//!
//! ```text
//! create_session()
//!     │
//!     ├── FileRegistry::load()   ([registry.path])
//!     └── MarkdownDocs::new()    ([docs.root])
//!
//! build_all()
//!     │
//!     ├── clean output           ([build.clean])
//!     ├── collect_templates()
//!     ├── compile_batch()  ──► schemas/**/*.json
//!     └── report diagnostics
//! ```

use crate::{
    compiler::{BatchReport, BuildSession, PathMapper, collect_templates},
    config::SchemaConfig,
    data::{docs::MarkdownDocs, registry::FileRegistry},
    log,
};
use anyhow::{Context, Result, bail};
use std::{fs, path::PathBuf};

/// Create the build session for a configuration.
pub fn create_session(config: &SchemaConfig) -> Result<BuildSession> {
    let mapper = PathMapper::new(&config.build.src, &config.build.out);
    let mut session = BuildSession::new(mapper).with_pretty(config.build.pretty);

    if let Some(registry) = load_registry(config)? {
        session = session.with_registry(Box::new(registry));
    }
    if let Some(root) = &config.docs.root {
        session = session.with_docs(Box::new(MarkdownDocs::new(root, config.docs.base_url.clone())));
    }

    Ok(session)
}

/// Load the configured registry file, if any.
pub fn load_registry(config: &SchemaConfig) -> Result<Option<FileRegistry>> {
    let Some(path) = &config.registry.path else {
        return Ok(None);
    };
    let registry = FileRegistry::load(path)
        .with_context(|| format!("Failed to load registry {}", path.display()))?;
    log!("registry"; "{} keys from {}", registry.len(), rel_display(config, path));
    Ok(Some(registry))
}

/// Every template currently in the source tree.
pub fn source_files(config: &SchemaConfig) -> Vec<PathBuf> {
    collect_templates(&config.build.src)
}

/// Compile the whole source tree once.
///
/// Fails if any file failed; output of the files that compiled is kept.
pub fn build_all(session: &mut BuildSession, config: &SchemaConfig) -> Result<()> {
    if config.build.clean {
        clean_output(config)?;
    }

    let files = source_files(config);
    log!("build"; "compiling {} templates", files.len());
    let report = session.compile_batch(&files);
    summarize(session, &report);

    if !report.is_ok() {
        bail!("{} of {} templates failed", report.failures.len(), files.len());
    }
    Ok(())
}

/// Log the outcome of a batch and flush its diagnostics.
pub fn summarize(session: &mut BuildSession, report: &BatchReport) {
    let diagnostics = session.diagnostics_mut();
    let count = diagnostics.len();
    diagnostics.report();

    if count > 0 {
        log!("diag"; "{count} diagnostics");
    }
    log!("build"; "built {} files ({} compiled)", report.written, report.compiled);
}

fn clean_output(config: &SchemaConfig) -> Result<()> {
    let out = &config.build.out;
    if out.exists() {
        fs::remove_dir_all(out)
            .with_context(|| format!("Failed to clean output directory {}", out.display()))?;
        log!("build"; "cleaned {}", rel_display(config, out));
    }
    Ok(())
}

fn rel_display(config: &SchemaConfig, path: &std::path::Path) -> String {
    path.strip_prefix(config.get_root())
        .unwrap_or(path)
        .display()
        .to_string()
}
