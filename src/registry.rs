//! Metadata registries.
//!
//! Three independent stores keyed by absolute path:
//!
//! | Registry     | Record               | Filled by                      |
//! |--------------|----------------------|--------------------------------|
//! | `content`    | [`ContentRecord`]    | content compiler               |
//! | `templates`  | [`DependencyRecord`] | dependency reload              |
//! | `components` | [`DependencyRecord`] | dependency reload              |
//!
//! Callers only see the [`Store`] trait. The default implementation is a
//! sharded concurrent map, so parallel readers (the tag indexer fans out
//! with rayon) need no extra locking.

use crate::{
    compiler::ContentRecord,
    error::{SiteError, SiteResult},
    markup::{Markup, MarkupError},
    source::SourceFile,
};
use dashmap::DashMap;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

// ============================================================================
// Store Abstraction
// ============================================================================

/// Key → record map with one live record per key.
pub trait Store<V>: Send + Sync {
    /// Clone of the record stored under `key`.
    fn get(&self, key: &Path) -> Option<V>;

    /// Insert or overwrite. Returns the previous record.
    fn set(&self, key: PathBuf, value: V) -> Option<V>;

    fn delete(&self, key: &Path) -> Option<V>;

    fn contains(&self, key: &Path) -> bool;

    /// Keys in unspecified order.
    fn keys(&self) -> Vec<PathBuf>;

    /// Snapshot of all records in unspecified order.
    fn values(&self) -> Vec<V>;

    /// Drop every record for which `keep` returns false. Returns how many were dropped.
    fn retain(&self, keep: &dyn Fn(&Path, &V) -> bool) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`Store`] backed by `DashMap`.
#[derive(Debug)]
pub struct ConcurrentStore<V> {
    map: DashMap<PathBuf, V>,
}

impl<V> Default for ConcurrentStore<V> {
    fn default() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

impl<V: Clone + Send + Sync> Store<V> for ConcurrentStore<V> {
    fn get(&self, key: &Path) -> Option<V> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: PathBuf, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    fn delete(&self, key: &Path) -> Option<V> {
        self.map.remove(key).map(|(_, value)| value)
    }

    fn contains(&self, key: &Path) -> bool {
        self.map.contains_key(key)
    }

    fn keys(&self) -> Vec<PathBuf> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    fn values(&self) -> Vec<V> {
        self.map.iter().map(|entry| entry.value().clone()).collect()
    }

    fn retain(&self, keep: &dyn Fn(&Path, &V) -> bool) -> usize {
        let before = self.map.len();
        self.map.retain(|key, value| keep(key, value));
        before - self.map.len()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

// ============================================================================
// Records
// ============================================================================

/// Registry entry for a template or component file.
#[derive(Debug, Clone)]
pub struct DependencyRecord {
    /// Template name (`post`, `blog/entry`) or lowercased component name.
    pub name: String,
    pub source: SourceFile,
    /// Set when the file could not be parsed. Surfaces when a page uses it.
    pub parse_error: Option<MarkupError>,
}

impl DependencyRecord {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    /// Parsed markup, or the stored parse failure.
    pub fn tree(&self) -> SiteResult<&Markup> {
        if let Some(tree) = self.source.tree() {
            return Ok(tree);
        }
        let (position, message) = self
            .parse_error
            .as_ref()
            .map_or((0, "markup was never parsed".to_owned()), |err| {
                (err.position, err.message.clone())
            });
        Err(SiteError::Markup {
            path: self.source.path.clone(),
            position,
            message,
        })
    }
}

// ============================================================================
// Registry Set
// ============================================================================

/// The three registries shared by every pipeline stage.
#[derive(Clone)]
pub struct Registries {
    pub content: Arc<dyn Store<ContentRecord>>,
    pub templates: Arc<dyn Store<DependencyRecord>>,
    pub components: Arc<dyn Store<DependencyRecord>>,
}

impl Registries {
    pub fn concurrent() -> Self {
        Self {
            content: Arc::new(ConcurrentStore::default()),
            templates: Arc::new(ConcurrentStore::default()),
            components: Arc::new(ConcurrentStore::default()),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::concurrent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;

    fn record(name: &str, html: Option<&str>) -> DependencyRecord {
        let path = PathBuf::from(format!("/site/templates/{name}.html"));
        let mut source = SourceFile::from_bytes(SourceKind::Template, &path, Vec::new());
        if let Some(html) = html {
            source.attach_tree(Markup::parse(html).unwrap());
        }
        DependencyRecord {
            name: name.to_owned(),
            source,
            parse_error: html.is_none().then(|| MarkupError {
                position: 3,
                message: "bad".into(),
            }),
        }
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let store: ConcurrentStore<DependencyRecord> = ConcurrentStore::default();
        let key = PathBuf::from("/site/templates/post.html");

        assert!(store.set(key.clone(), record("post", Some("<p>1</p>"))).is_none());
        let previous = store.set(key.clone(), record("post", Some("<p>2</p>")));
        assert!(previous.is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&key).unwrap().tree().unwrap().serialize(),
            "<p>2</p>"
        );
    }

    #[test]
    fn test_delete_and_contains() {
        let store: ConcurrentStore<u32> = ConcurrentStore::default();
        store.set("/a".into(), 1);
        assert!(store.contains(Path::new("/a")));
        assert_eq!(store.delete(Path::new("/a")), Some(1));
        assert!(store.is_empty());
        assert_eq!(store.delete(Path::new("/a")), None);
    }

    #[test]
    fn test_retain_reports_dropped() {
        let store: ConcurrentStore<u32> = ConcurrentStore::default();
        for (i, key) in ["/a", "/b", "/c"].into_iter().enumerate() {
            store.set(key.into(), i as u32);
        }
        let dropped = store.retain(&|key, _| key != Path::new("/b"));
        assert_eq!(dropped, 1);
        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec![PathBuf::from("/a"), PathBuf::from("/c")]);
    }

    #[test]
    fn test_dependency_parse_error_surfaces() {
        let broken = record("broken", None);
        let err = broken.tree().unwrap_err();
        match err {
            SiteError::Markup { position, path, .. } => {
                assert_eq!(position, 3);
                assert!(path.ends_with("broken.html"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registries_are_independent() {
        let registries = Registries::concurrent();
        registries
            .templates
            .set("/site/x.html".into(), record("x", Some("<p></p>")));
        assert_eq!(registries.templates.len(), 1);
        assert!(registries.components.is_empty());
        assert!(registries.content.is_empty());
    }
}
