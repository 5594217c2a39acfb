//! Site initialization module.
//!
//! Creates the source layout and, on request, a small starter site.

use crate::config::SiteConfig;
use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Default config filename
const CONFIG_FILE: &str = "weft.toml";

/// Directories every source tree has
const SITE_DIRS: &[&str] = &["content", "templates", "components", "assets"];

/// Starter files written by `init --seed`, relative to the source root
const SEED_FILES: &[(&str, &str)] = &[
    ("content/index.md", include_str!("embed/seed/content/index.md")),
    ("templates/index.html", include_str!("embed/seed/templates/index.html")),
    ("templates/_tags.html", include_str!("embed/seed/templates/_tags.html")),
    (
        "templates/_individual_tag.html",
        include_str!("embed/seed/templates/_individual_tag.html"),
    ),
    ("components/Navbar.html", include_str!("embed/seed/components/Navbar.html")),
    ("components/Footerbar.html", include_str!("embed/seed/components/Footerbar.html")),
    ("components/Tags.html", include_str!("embed/seed/components/Tags.html")),
    (
        "assets/styles/global.css",
        include_str!("embed/seed/assets/styles/global.css"),
    ),
];

/// `weft init`: scaffold the source tree and write a default config if absent.
pub fn init_site(config: &SiteConfig, seed: bool) -> Result<()> {
    ensure_scaffold(&config.build.source, &config.build.output, seed)?;
    init_default_config(&config.config_path)
}

/// Create the source directories and the output directory.
///
/// With `seed`, starter files are written where no file exists yet.
/// Existing files are never touched.
pub fn ensure_scaffold(src: &Path, dest: &Path, seed: bool) -> Result<()> {
    for dir in SITE_DIRS {
        let path = src.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    if seed {
        for (relative, contents) in SEED_FILES {
            write_if_absent(&src.join(relative), contents)?;
        }
    }

    Ok(())
}

/// Write default configuration file
fn init_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    write_if_absent(path, &content)
}

fn write_if_absent(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Markup;
    use tempfile::TempDir;

    #[test]
    fn test_scaffold_without_seed_creates_dirs_only() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("public");

        ensure_scaffold(&src, &dest, false).unwrap();
        for sub in SITE_DIRS {
            assert!(src.join(sub).is_dir(), "{sub} missing");
        }
        assert!(dest.is_dir());
        assert!(!src.join("content/index.md").exists());
    }

    #[test]
    fn test_seed_writes_every_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");

        ensure_scaffold(&src, &dir.path().join("public"), true).unwrap();
        for (relative, _) in SEED_FILES {
            assert!(src.join(relative).is_file(), "{relative} missing");
        }
    }

    #[test]
    fn test_seed_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("components")).unwrap();
        fs::write(src.join("components/Navbar.html"), "<nav>mine</nav>").unwrap();

        ensure_scaffold(&src, &dir.path().join("public"), true).unwrap();
        assert_eq!(
            fs::read_to_string(src.join("components/Navbar.html")).unwrap(),
            "<nav>mine</nav>"
        );
    }

    #[test]
    fn test_seed_markup_parses() {
        for (relative, contents) in SEED_FILES.iter().filter(|(path, _)| path.ends_with(".html")) {
            assert!(Markup::parse(contents).is_ok(), "{relative} does not parse");
        }
    }

    #[test]
    fn test_init_site_writes_config_once() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.build.source = dir.path().join("src");
        config.build.output = dir.path().join("public");
        config.config_path = dir.path().join(CONFIG_FILE);

        init_site(&config, false).unwrap();
        let written = fs::read_to_string(&config.config_path).unwrap();
        assert!(SiteConfig::from_str(&written).is_ok());

        fs::write(&config.config_path, "[serve]\nport = 1\n").unwrap();
        init_site(&config, false).unwrap();
        assert_eq!(
            fs::read_to_string(&config.config_path).unwrap(),
            "[serve]\nport = 1\n"
        );
    }
}
