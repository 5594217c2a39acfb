//! Template and component loading.
//!
//! A dependency reload always re-reads every `*.html` file under
//! `templates/` and `components/`. Records for files that disappeared are
//! dropped. A file whose markup fails to parse is still registered with its
//! parse error, so only the pages that actually use it fail.

use crate::{
    error::{SiteError, SiteResult},
    log,
    logger::Sink,
    markup::{Markup, MarkupError},
    registry::{DependencyRecord, Registries, Store},
    source::{SourceFile, SourceKind},
};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm"];

/// Counts reported by [`reload`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DependencyReport {
    pub templates: usize,
    pub components: usize,
    pub broken: usize,
    pub removed: usize,
}

/// Name of a template: path below `templates/` without extension, `/`-separated.
pub fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    (!segments.is_empty()).then(|| segments.join("/"))
}

/// Name of a component: lowercased file stem.
pub fn component_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
}

/// Re-read all templates and components into the registries.
pub fn reload(
    templates_dir: &Path,
    components_dir: &Path,
    registries: &Registries,
    sink: &Sink,
) -> SiteResult<DependencyReport> {
    let mut report = DependencyReport::default();

    let templates = load_dir(
        templates_dir,
        SourceKind::Template,
        |path| template_name(templates_dir, path),
        registries.templates.as_ref(),
        sink,
        &mut report,
    )?;
    report.templates = templates;

    let components = load_dir(
        components_dir,
        SourceKind::Component,
        component_name,
        registries.components.as_ref(),
        sink,
        &mut report,
    )?;
    report.components = components;

    Ok(report)
}

fn load_dir(
    dir: &Path,
    kind: SourceKind,
    name_of: impl Fn(&Path) -> Option<String>,
    store: &dyn Store<DependencyRecord>,
    sink: &Sink,
    report: &mut DependencyReport,
) -> SiteResult<usize> {
    let mut seen: FxHashSet<PathBuf> = FxHashSet::default();

    if dir.is_dir() {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|source| SiteError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_markup_file(path) {
                continue;
            }
            let Some(name) = name_of(path) else {
                continue;
            };

            let record = load_file(kind, path, name, sink)?;
            if record.parse_error.is_some() {
                report.broken += 1;
            }
            store.set(path.to_path_buf(), record);
            seen.insert(path.to_path_buf());
        }
    }

    report.removed += store.retain(&|path, _| seen.contains(path));
    Ok(seen.len())
}

fn load_file(
    kind: SourceKind,
    path: &Path,
    name: String,
    sink: &Sink,
) -> SiteResult<DependencyRecord> {
    let mut source = SourceFile::read(kind, path)?;

    let parsed = match source.text() {
        Ok(text) => Markup::parse(text).map_err(|err| (err.position, err.message)),
        Err(SiteError::Markup {
            position, message, ..
        }) => Err((position, message)),
        Err(other) => return Err(other),
    };

    let parse_error = match parsed {
        Ok(tree) => {
            source.attach_tree(tree);
            None
        }
        Err((position, message)) => {
            log!(sink => "deps"; "{}: {message} (byte {position})", path.display());
            Some(MarkupError { position, message })
        }
    };

    Ok(DependencyRecord {
        name,
        source,
        parse_error,
    })
}

fn is_markup_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKUP_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext)))
}
