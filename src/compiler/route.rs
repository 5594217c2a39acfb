//! Content path → site route.
//!
//! # Path Mapping Examples
//!
//! | Source                     | Route          | Output                           |
//! |----------------------------|----------------|----------------------------------|
//! | `content/index.md`         | `/`            | `public/index.html`              |
//! | `content/blog/index.md`    | `/blog/`       | `public/blog/index.html`         |
//! | `content/blog/post.md`     | `/blog/post/`  | `public/blog/post/index.html`    |
//!
//! Both functions are pure: no filesystem access.

use crate::error::{SiteError, SiteResult};
use std::path::{Component, Path, PathBuf};

/// Route of a content file relative to `root`.
pub fn route_for(root: &Path, path: &Path) -> SiteResult<String> {
    let relative = path.strip_prefix(root).map_err(|_| SiteError::Route {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;
    let relative = relative.with_extension("");

    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.last().is_some_and(|last| last == "index") {
        segments.pop();
    }

    if segments.is_empty() {
        Ok("/".to_owned())
    } else {
        Ok(format!("/{}/", segments.join("/")))
    }
}

/// `index.html` location of `route` under the output directory.
pub fn output_path(output: &Path, route: &str) -> PathBuf {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        output.join("index.html")
    } else {
        output.join(trimmed).join("index.html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> String {
        route_for(Path::new("/site/content"), Path::new(path)).unwrap()
    }

    #[test]
    fn test_root_index() {
        assert_eq!(route("/site/content/index.md"), "/");
    }

    #[test]
    fn test_nested_index_collapses() {
        assert_eq!(route("/site/content/blog/index.md"), "/blog/");
    }

    #[test]
    fn test_plain_page() {
        assert_eq!(route("/site/content/blog/post.md"), "/blog/post/");
        assert_eq!(route("/site/content/about.md"), "/about/");
    }

    #[test]
    fn test_only_last_extension_stripped() {
        assert_eq!(route("/site/content/notes.v2.md"), "/notes.v2/");
    }

    #[test]
    fn test_index_only_collapses_as_last_segment() {
        assert_eq!(route("/site/content/index/page.md"), "/index/page/");
    }

    #[test]
    fn test_idempotent() {
        let first = route("/site/content/a/b.md");
        let second = route("/site/content/a/b.md");
        assert_eq!(first, second);
    }

    #[test]
    fn test_outside_root_is_error() {
        let err = route_for(Path::new("/site/content"), Path::new("/elsewhere/a.md")).unwrap_err();
        assert!(matches!(err, SiteError::Route { .. }));
    }

    #[test]
    fn test_output_path() {
        let out = Path::new("/site/public");
        assert_eq!(output_path(out, "/"), PathBuf::from("/site/public/index.html"));
        assert_eq!(
            output_path(out, "/blog/post/"),
            PathBuf::from("/site/public/blog/post/index.html")
        );
    }
}
