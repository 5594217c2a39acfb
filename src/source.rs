//! Source files as read from disk.

use crate::{
    error::{SiteError, SiteResult},
    markup::Markup,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Role of a source file in the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Content,
    Template,
    Component,
}

/// Raw bytes of one file plus the markup tree parsed from it.
///
/// For content the tree is the rendered markdown body. It is replaced, never
/// merged, whenever the file is read again.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub raw: Vec<u8>,
    tree: Option<Markup>,
}

impl SourceFile {
    pub fn read(kind: SourceKind, path: &Path) -> SiteResult<Self> {
        let raw = fs::read(path).map_err(|err| SiteError::read(path, err))?;
        Ok(Self::from_bytes(kind, path, raw))
    }

    pub fn from_bytes(kind: SourceKind, path: &Path, raw: Vec<u8>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            raw,
            tree: None,
        }
    }

    /// The file as UTF-8 text.
    pub fn text(&self) -> SiteResult<&str> {
        std::str::from_utf8(&self.raw).map_err(|err| {
            let message = format!("not valid UTF-8 ({err})");
            match self.kind {
                SourceKind::Content => SiteError::Markdown {
                    path: self.path.clone(),
                    message,
                },
                SourceKind::Template | SourceKind::Component => SiteError::Markup {
                    path: self.path.clone(),
                    position: err.valid_up_to(),
                    message,
                },
            }
        })
    }

    #[inline]
    pub const fn tree(&self) -> Option<&Markup> {
        self.tree.as_ref()
    }

    pub fn attach_tree(&mut self, tree: Markup) {
        self.tree = Some(tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_read_missing_file_is_io() {
        let err = SourceFile::read(SourceKind::Content, Path::new("/definitely/not/here.md"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let file = SourceFile::from_bytes(SourceKind::Template, Path::new("t.html"), vec![0xff]);
        assert_eq!(file.text().unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_attach_tree_replaces() {
        let mut file = SourceFile::from_bytes(SourceKind::Content, Path::new("a.md"), Vec::new());
        assert!(file.tree().is_none());
        file.attach_tree(Markup::parse("<p>1</p>").unwrap());
        file.attach_tree(Markup::parse("<p>2</p>").unwrap());
        assert_eq!(file.tree().unwrap().serialize(), "<p>2</p>");
    }
}
