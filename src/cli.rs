//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;

/// Compile schema templates into JSON Schema, then watch for changes
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to the root
    #[arg(short = 'C', long, default_value = "schemac.toml")]
    pub config: PathBuf,

    /// Template source directory (relative to project root)
    #[arg(short, long)]
    pub src: Option<PathBuf>,

    /// Output directory (relative to project root)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Registry file for `import_minecraft_registry`
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Local documentation directory for `$docsUrl` correlation
    #[arg(long)]
    pub docs: Option<PathBuf>,

    /// Remove the output directory before building
    #[arg(long)]
    pub clean: bool,

    /// Build once and exit instead of watching
    #[arg(long)]
    pub once: bool,
}
