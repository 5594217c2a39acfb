//! File category classification for watch mode.
//!
//! A changed path is related to the source root and classified by its first
//! component below it.
//!
//! # File Categories
//!
//! | First component | Category    | Rebuild phases                         |
//! |-----------------|-------------|----------------------------------------|
//! | `assets`        | Asset       | assets                                 |
//! | `components`    | Component   | dependencies, content, tags            |
//! | `templates`     | Template    | dependencies, content, tags            |
//! | `content`       | Content     | content, tags                          |
//! | anything else   | Unknown     | none                                   |
//!
//! A path that cannot be related to the source root at all is not an error:
//! it classifies as [`Classification::Fallback`], which rebuilds everything.

use std::{
    env,
    path::{Component, Path, PathBuf},
};

/// Category of a changed file, used to determine rebuild phases in watch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// Under `assets/`, copied verbatim
    Asset,
    /// Under `components/`
    Component,
    /// Under `templates/`
    Template,
    /// Under `content/`
    Content,
    /// Inside the source root but outside every known directory
    Unknown,
}

impl FileCategory {
    /// Get the short name for this category (used in logs)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Asset => "assets",
            Self::Component => "components",
            Self::Template => "templates",
            Self::Content => "content",
            Self::Unknown => "unknown",
        }
    }

    fn from_dir_name(name: &str) -> Self {
        match name {
            "assets" => Self::Asset,
            "components" => Self::Component,
            "templates" => Self::Template,
            "content" => Self::Content,
            _ => Self::Unknown,
        }
    }
}

/// Outcome of classifying one changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Category(FileCategory),
    /// The path could not be related to the source root.
    Fallback,
}

/// Classify `path` by its first component below `source_root`.
pub fn categorize_path(path: &Path, source_root: &Path) -> Classification {
    let path = normalize_path(path);

    let Ok(relative) = path.strip_prefix(source_root) else {
        return Classification::Fallback;
    };
    match relative.components().next() {
        Some(Component::Normal(first)) => {
            Classification::Category(FileCategory::from_dir_name(&first.to_string_lossy()))
        }
        _ => Classification::Fallback,
    }
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Config paths are already canonicalized, so we need to canonicalize
/// incoming paths (e.g., from file watcher) before comparison.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()
                .map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(path: &str) -> Classification {
        categorize_path(Path::new(path), Path::new("/nonexistent-root/src"))
    }

    #[test]
    fn test_category_name() {
        assert_eq!(FileCategory::Asset.name(), "assets");
        assert_eq!(FileCategory::Component.name(), "components");
        assert_eq!(FileCategory::Template.name(), "templates");
        assert_eq!(FileCategory::Content.name(), "content");
        assert_eq!(FileCategory::Unknown.name(), "unknown");
    }

    #[test]
    fn test_categorize_by_first_component() {
        use Classification::Category;
        assert_eq!(
            classify("/nonexistent-root/src/assets/styles/global.css"),
            Category(FileCategory::Asset)
        );
        assert_eq!(
            classify("/nonexistent-root/src/components/Navbar.html"),
            Category(FileCategory::Component)
        );
        assert_eq!(
            classify("/nonexistent-root/src/templates/post.html"),
            Category(FileCategory::Template)
        );
        assert_eq!(
            classify("/nonexistent-root/src/content/blog/post.md"),
            Category(FileCategory::Content)
        );
        assert_eq!(
            classify("/nonexistent-root/src/README.md"),
            Category(FileCategory::Unknown)
        );
    }

    #[test]
    fn test_unrelated_path_falls_back() {
        assert_eq!(classify("/elsewhere/content/post.md"), Classification::Fallback);
        assert_eq!(classify("/nonexistent-root/src"), Classification::Fallback);
    }

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }
}
