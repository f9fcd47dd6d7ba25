//! Project configuration from `schemac.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                         |
//! |--------------|-------------------------------------------------|
//! | `[build]`    | Source and output trees, cleaning, formatting   |
//! | `[watch]`    | Build tick interval and event debounce          |
//! | `[registry]` | Registry file for registry imports              |
//! | `[docs]`     | Local documentation pages for `$docsUrl`        |
//!
//! The file is optional; without it every section takes its defaults.
//!
//! # Example
//!
//! ```toml
//! [build]
//! src = "src/schemas"
//! out = "schemas"
//!
//! [registry]
//! path = "data/registry.yml"
//!
//! [docs]
//! root = "docs"
//! base_url = "https://docs.example/en/latest/"
//! ```

mod build;
pub mod defaults;
mod docs;
mod error;
mod registry;
mod watch;

use build::BuildConfig;
use docs::DocsConfig;
use error::ConfigError;
use registry::RegistryConfig;
use watch::WatchConfig;

use crate::cli::Cli;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing schemac.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub docs: DocsConfig,
}

impl SchemaConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SchemaConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `<root>/<cli.config>` if it exists, apply CLI overrides and
    /// normalize every path.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.src, cli.src.as_ref());
        Self::update_option(&mut self.build.out, cli.out.as_ref());
        if cli.registry.is_some() {
            self.registry.path = cli.registry.clone();
        }
        if cli.docs.is_some() {
            self.docs.root = cli.docs.clone();
        }
        self.build.clean |= cli.clean;

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve every path against the root and make it absolute
    fn update_path_with_root(&mut self, root: &Path, config_name: &Path) {
        let root = normalize_path(root);
        self.set_root(&root);

        self.config_path = normalize_path(&root.join(config_name));
        self.build.src = normalize_path(&root.join(&self.build.src));
        self.build.out = normalize_path(&root.join(&self.build.out));

        if let Some(path) = self.registry.path.take() {
            self.registry.path = Some(normalize_path(&root.join(path)));
        }
        if let Some(path) = self.docs.root.take() {
            self.docs.root = Some(normalize_path(&root.join(path)));
        }
    }

    /// Validate the normalized configuration
    pub fn validate(&self) -> Result<()> {
        let src = &self.build.src;
        let out = &self.build.out;

        if !src.exists() {
            bail!(ConfigError::Validation(format!(
                "[build.src] `{}` not found",
                src.display()
            )));
        }
        if !src.is_dir() {
            bail!(ConfigError::Validation("[build.src] is not a directory".into()));
        }
        if src.starts_with(out) {
            bail!(ConfigError::Validation(
                "[build.out] must not be or contain [build.src]".into()
            ));
        }

        if let Some(path) = &self.registry.path
            && !path.is_file()
        {
            bail!(ConfigError::Validation(format!(
                "[registry.path] `{}` not found",
                path.display()
            )));
        }
        if let Some(path) = &self.docs.root
            && !path.is_dir()
        {
            bail!(ConfigError::Validation(format!(
                "[docs.root] `{}` is not a directory",
                path.display()
            )));
        }

        Ok(())
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("schemac").chain(args.iter().copied()))
    }

    #[test]
    fn test_from_str() {
        let config = SchemaConfig::from_str(
            r#"
            [build]
            src = "templates"

            [watch]
            interval_ms = 100
        "#,
        )
        .unwrap();
        assert_eq!(config.build.src, PathBuf::from("templates"));
        assert_eq!(config.watch.interval_ms, 100);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SchemaConfig::from_str("[build\nsrc = 1").is_err());
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        assert!(SchemaConfig::from_str("[serve]\nport = 1\n").is_err());
    }

    #[test]
    fn test_load_without_config_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/schemas")).unwrap();
        let root = dir.path().to_str().unwrap();

        let config = SchemaConfig::load(&cli(&["--root", root])).unwrap();
        let root = normalize_path(dir.path());
        assert_eq!(config.get_root(), root);
        assert_eq!(config.build.src, root.join("src/schemas"));
        assert_eq!(config.build.out, root.join("schemas"));
        assert!(!config.build.clean);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(dir.path().join("reg.yml"), "a: [x]\n").unwrap();
        fs::write(
            dir.path().join("schemac.toml"),
            "[build]\nsrc = \"missing\"\nout = \"dist\"\n",
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();

        let config = SchemaConfig::load(&cli(&[
            "--root", root, "--src", "templates", "--registry", "reg.yml", "--clean",
        ]))
        .unwrap();
        let root = normalize_path(dir.path());
        assert_eq!(config.build.src, root.join("templates"));
        assert_eq!(config.build.out, root.join("dist"));
        assert_eq!(config.registry.path, Some(root.join("reg.yml")));
        assert!(config.build.clean);
    }

    #[test]
    fn test_validate_missing_src() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let err = SchemaConfig::load(&cli(&["--root", root])).unwrap_err();
        assert!(err.to_string().contains("[build.src]"));
    }

    #[test]
    fn test_validate_out_containing_src() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("schemas/src")).unwrap();
        let root = dir.path().to_str().unwrap();
        let err = SchemaConfig::load(&cli(&["--root", root, "--src", "schemas/src"])).unwrap_err();
        assert!(err.to_string().contains("[build.out]"));
    }

    #[test]
    fn test_validate_missing_registry() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/schemas")).unwrap();
        let root = dir.path().to_str().unwrap();
        let err = SchemaConfig::load(&cli(&["--root", root, "--registry", "nope.yml"])).unwrap_err();
        assert!(err.to_string().contains("[registry.path]"));
    }
}
