//! `[build]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in schemac.toml.
///
/// # Example
/// ```toml
/// [build]
/// src = "src/schemas"   # Template tree
/// out = "schemas"       # Mirrored JSON output
/// clean = true          # Remove `out` before the initial build
/// pretty = true         # Tab-indented output
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Template source directory.
    #[serde(default = "defaults::build::src")]
    #[educe(Default = defaults::build::src())]
    pub src: PathBuf,

    /// Output directory, mirroring `src`.
    #[serde(default = "defaults::build::out")]
    #[educe(Default = defaults::build::out())]
    pub out: PathBuf,

    /// Remove the output directory before the initial full build.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Tab-indented output instead of compact JSON.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub pretty: bool,
}
