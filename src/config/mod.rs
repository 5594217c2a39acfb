//! Site configuration management for `weft.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                         |
//! |---------------|-------------------------------------------------|
//! | `[build]`     | Source and output paths, error policy, clean    |
//! | `[markdown]`  | Rendering extensions and highlight theme        |
//! | `[serve]`     | Development server (port, interface, watch)     |
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "src"
//! output = "public"
//! on_error = "continue"
//!
//! [markdown]
//! highlight_theme = "base16-ocean.dark"
//!
//! [serve]
//! port = 8084
//! ```
//!
//! The file is optional: a missing `weft.toml` means all defaults.

mod build;
pub mod defaults;
mod error;
mod markdown;
mod serve;

pub use build::{BuildConfig, ErrorPolicy};
pub use error::ConfigError;
pub use markdown::MarkdownConfig;
pub use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing weft.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Absolute project root (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Markdown rendering settings
    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `<root>/<config>` if present, apply CLI overrides and validate.
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

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli.root.clone().unwrap_or_else(|| self.root.clone());
        self.update_path_with_root(&root, cli);

        if cli.clean() {
            self.build.clean = true;
        }

        if let Commands::Serve {
            interface,
            port,
            watch,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, cli: &Cli) {
        Self::update_option(&mut self.build.source, cli.src.as_ref());
        Self::update_option(&mut self.build.output, cli.dest.as_ref());

        let root = Self::normalize_path(root);
        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.build.source = Self::normalize_path(&root.join(&self.build.source));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Reject layouts where building would overwrite or re-read its own input.
    pub fn validate(&self) -> Result<()> {
        let source = &self.build.source;
        let output = &self.build.output;

        if source.starts_with(output) {
            bail!(ConfigError::Validation(format!(
                "[build.output] `{}` must not contain [build.source]",
                output.display()
            )));
        }
        if output.starts_with(source.join("content")) {
            bail!(ConfigError::Validation(format!(
                "[build.output] `{}` must not be inside the content directory",
                output.display()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("weft").chain(args.iter().copied()))
    }

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str(
            r#"
            [build]
            output = "dist"
            [serve]
            port = 9000
        "#,
        )
        .unwrap();

        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.serve.port, 9000);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::from_str("[build\noutput = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(SiteConfig::from_str("[deploy]\nforce = true\n").is_err());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&SiteConfig::default()).unwrap();
        let parsed = SiteConfig::from_str(&text).unwrap();
        assert_eq!(parsed.build.source, PathBuf::from("src"));
        assert_eq!(parsed.serve.port, 8084);
    }

    #[test]
    fn test_load_without_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();

        let config = SiteConfig::load(&cli(&["--root", root, "build"])).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.root, root);
        assert_eq!(config.build.source, root.join("src"));
        assert_eq!(config.build.output, root.join("public"));
        assert_eq!(config.config_path, root.join("weft.toml"));
        assert!(!config.build.clean);
    }

    #[test]
    fn test_load_reads_file_and_applies_cli() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("weft.toml"),
            "[build]\nsource = \"site\"\n[serve]\nport = 9000\nwatch = true\n",
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();

        let config = SiteConfig::load(&cli(&[
            "--root", root, "--dest", "out", "serve", "--clean", "--watch", "false",
        ]))
        .unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.build.source, root.join("site"));
        assert_eq!(config.build.output, root.join("out"));
        assert_eq!(config.serve.port, 9000);
        assert!(!config.serve.watch);
        assert!(config.build.clean);
    }

    #[test]
    fn test_validate_rejects_overlapping_dirs() {
        let mut config = SiteConfig::default();
        config.build.source = PathBuf::from("/site/src");

        config.build.output = PathBuf::from("/site/src");
        assert!(config.validate().is_err());

        config.build.output = PathBuf::from("/site");
        assert!(config.validate().is_err());

        config.build.output = PathBuf::from("/site/src/content/public");
        assert!(config.validate().is_err());

        config.build.output = PathBuf::from("/site/public");
        assert!(config.validate().is_ok());
    }
}
