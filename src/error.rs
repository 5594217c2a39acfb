//! Error taxonomy for the build pipeline.
//!
//! Every failure raised while compiling, composing or writing a page is a
//! [`SiteError`]. Variants are grouped into three kinds:
//!
//! | Kind        | Variants                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | `Io`        | `Read`, `Write`, `Walk`                                         |
//! | `Parse`     | `FrontMatter`, `Markdown`, `Markup`                             |
//! | `Reference` | `MissingTemplateKey`, `MissingTemplate`, `MissingComponent`,    |
//! |             | `RecursiveComponent`, `Route`                                   |
//!
//! `Batch` aggregates per-file failures that were quarantined during a pass.
//! A change path that cannot be related to the source root is not an error
//! at all, see [`crate::utils::category::Classification::Fallback`].

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse classification of a [`SiteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Reference,
}

impl ErrorKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Parse => "parse",
            Self::Reference => "reference",
        }
    }
}

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("failed to read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk `{}`", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid front matter in `{}`: {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },

    #[error("invalid markdown in `{}`: {message}", path.display())]
    Markdown { path: PathBuf, message: String },

    #[error("malformed markup in `{}` at byte {position}: {message}", path.display())]
    Markup {
        path: PathBuf,
        position: usize,
        message: String,
    },

    #[error("`{}` has no `template` key in its front matter", path.display())]
    MissingTemplateKey { path: PathBuf },

    #[error("`{}` references missing template `{name}`", path.display())]
    MissingTemplate { path: PathBuf, name: String },

    #[error("`{}` uses <{name}> but no `{name}` component is registered", path.display())]
    MissingComponent { path: PathBuf, name: String },

    #[error("component `{name}` expands into itself while composing `{}`", path.display())]
    RecursiveComponent { path: PathBuf, name: String },

    #[error("`{}` is outside the content root `{}`", path.display(), root.display())]
    Route { path: PathBuf, root: PathBuf },

    #[error("{} file(s) failed to build: {}", .failures.len(), list_paths(.failures))]
    Batch { failures: Vec<SiteError> },
}

impl SiteError {
    /// Taxonomy bucket of this error. `Batch` reports the kind of its first failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } | Self::Write { .. } | Self::Walk { .. } => ErrorKind::Io,
            Self::FrontMatter { .. } | Self::Markdown { .. } | Self::Markup { .. } => {
                ErrorKind::Parse
            }
            Self::MissingTemplateKey { .. }
            | Self::MissingTemplate { .. }
            | Self::MissingComponent { .. }
            | Self::RecursiveComponent { .. }
            | Self::Route { .. } => ErrorKind::Reference,
            Self::Batch { failures } => failures.first().map_or(ErrorKind::Io, Self::kind),
        }
    }

    /// The file this error is about, if it concerns a single file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Walk { path, .. }
            | Self::FrontMatter { path, .. }
            | Self::Markdown { path, .. }
            | Self::Markup { path, .. }
            | Self::MissingTemplateKey { path }
            | Self::MissingTemplate { path, .. }
            | Self::MissingComponent { path, .. }
            | Self::RecursiveComponent { path, .. }
            | Self::Route { path, .. } => Some(path),
            Self::Batch { .. } => None,
        }
    }

    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn list_paths(failures: &[SiteError]) -> String {
    failures
        .iter()
        .map(|err| {
            err.path()
                .map_or_else(|| err.to_string(), |p| p.display().to_string())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub type SiteResult<T> = Result<T, SiteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_kind_buckets() {
        let io = SiteError::read(Path::new("a.md"), io::Error::other("boom"));
        assert_eq!(io.kind(), ErrorKind::Io);

        let parse = SiteError::FrontMatter {
            path: "a.md".into(),
            message: "bad".into(),
        };
        assert_eq!(parse.kind(), ErrorKind::Parse);

        let reference = SiteError::MissingTemplate {
            path: "a.md".into(),
            name: "post".into(),
        };
        assert_eq!(reference.kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_missing_template_names_path_and_template() {
        let err = SiteError::MissingTemplate {
            path: "content/post.md".into(),
            name: "article".into(),
        };
        let display = err.to_string();
        assert!(display.contains("content/post.md"));
        assert!(display.contains("article"));
    }

    #[test]
    fn test_batch_lists_every_path() {
        let err = SiteError::Batch {
            failures: vec![
                SiteError::MissingTemplateKey { path: "a.md".into() },
                SiteError::MissingTemplateKey { path: "b.md".into() },
            ],
        };
        let display = err.to_string();
        assert!(display.starts_with("2 file(s)"));
        assert!(display.contains("a.md, b.md"));
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.path().is_none());
    }
}
