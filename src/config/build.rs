//! `[build]` section configuration.
//!
//! Contains the source and output paths plus the per-file error policy.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enums
// ============================================================================

/// What a content pass does when a single file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Record the failure, keep walking, report every failed file at the end (default).
    #[default]
    Continue,
    /// Stop the walk at the first failure. Pages written before it stay on disk.
    Abort,
}

// ============================================================================
// Main BuildConfig
// ============================================================================

/// `[build]` section in weft.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// source = "src"        # content/, templates/, components/, assets/
/// output = "public"     # Generated site
/// on_error = "abort"    # Stop at the first failing page
/// clean = true          # Wipe output before the startup build
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Source root directory.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Output directory for the generated site.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Per-file failure handling during a content pass.
    #[serde(default)]
    pub on_error: ErrorPolicy,

    /// Remove the output directory before the startup build.
    #[serde(default)]
    pub clean: bool,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use super::*;

    #[test]
    fn test_build_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.source, PathBuf::from("src"));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.on_error, ErrorPolicy::Continue);
        assert!(!config.build.clean);
    }

    #[test]
    fn test_build_override() {
        let config: SiteConfig = toml::from_str(
            r#"
            [build]
            source = "site"
            output = "dist"
            on_error = "abort"
            clean = true
        "#,
        )
        .unwrap();

        assert_eq!(config.build.source, PathBuf::from("site"));
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.on_error, ErrorPolicy::Abort);
        assert!(config.build.clean);
    }

    #[test]
    fn test_invalid_error_policy() {
        let result: Result<SiteConfig, _> = toml::from_str("[build]\non_error = \"ignore\"\n");
        assert!(result.is_err());
    }
}
