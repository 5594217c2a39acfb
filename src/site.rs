//! One rebuild pass over the source tree.
//!
//! # Architecture
//!
//! ```text
//! Site::rebuild(request)
//!     │
//!     ├── assets        src/assets/**  ──copy──►  dest/assets/**
//!     │
//!     ├── dependencies  templates/ + components/  ──►  registries (full reload)
//!     │
//!     ├── content       content/**.md  ──compile──►  record  ──compose──►  dest/<route>/index.html
//!     │                 content/**     ──copy──►  dest/**
//!     │
//!     └── tags          published records  ──►  dest/tags/index.html, dest/tags/<tag>/index.html
//! ```
//!
//! Phases run in that order and only when the request asks for them. A pass
//! always runs to completion or returns an error. It is never cancelled.

use crate::{
    compiler::{ContentCompiler, ContentRecord, assets, dependencies, is_markdown},
    compose::Composer,
    config::{ErrorPolicy, MarkdownConfig},
    error::{SiteError, SiteResult},
    log,
    logger::Sink,
    registry::Registries,
    schedule::RebuildRequest,
    tags::TagIndexer,
};
use rustc_hash::FxHashSet;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Instant,
};
use walkdir::WalkDir;

/// Source and output roots of one site.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
        }
    }

    pub fn content(&self) -> PathBuf {
        self.source.join("content")
    }

    pub fn templates(&self) -> PathBuf {
        self.source.join("templates")
    }

    pub fn components(&self) -> PathBuf {
        self.source.join("components")
    }

    pub fn assets(&self) -> PathBuf {
        self.source.join("assets")
    }
}

/// Counts from one rebuild pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub assets_copied: usize,
    pub templates: usize,
    pub components: usize,
    pub pages_written: usize,
    pub unpublished: usize,
    /// Non-markdown files copied out of `content/`.
    pub files_copied: usize,
    pub pages_removed: usize,
    pub tag_pages: usize,
}

impl fmt::Display for RebuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages ({} unpublished, {} removed), {} tag pages, {} files, {} assets, {} templates, {} components",
            self.pages_written,
            self.unpublished,
            self.pages_removed,
            self.tag_pages,
            self.files_copied,
            self.assets_copied,
            self.templates,
            self.components,
        )
    }
}

/// The whole pipeline with its registries.
pub struct Site {
    paths: SitePaths,
    registries: Registries,
    compiler: ContentCompiler,
    policy: ErrorPolicy,
    sink: Sink,
}

/// Per-file failures collected during one pass.
struct Failures {
    policy: ErrorPolicy,
    errors: Vec<SiteError>,
}

impl Failures {
    /// Record `err`. Returns it back when the pass must stop.
    fn push(&mut self, err: SiteError, sink: &Sink) -> SiteResult<()> {
        match self.policy {
            ErrorPolicy::Abort => Err(err),
            ErrorPolicy::Continue => {
                log!(sink => "error"; "{} error: {err}", err.kind().name());
                self.errors.push(err);
                Ok(())
            }
        }
    }
}

impl Site {
    pub fn new(paths: SitePaths, markdown: &MarkdownConfig, policy: ErrorPolicy, sink: Sink) -> Self {
        let registries = Registries::concurrent();
        let compiler = ContentCompiler::new(
            &paths.content(),
            markdown,
            registries.content.clone(),
            sink.clone(),
        );
        Self {
            paths,
            registries,
            compiler,
            policy,
            sink,
        }
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// Run the phases selected by `request`.
    ///
    /// Under [`ErrorPolicy::Continue`] every per-file failure is collected and
    /// returned as one [`SiteError::Batch`] after the tag pages are written.
    pub fn rebuild(&self, request: RebuildRequest) -> SiteResult<RebuildReport> {
        let started = Instant::now();
        let mut report = RebuildReport::default();
        let mut failures = Failures {
            policy: self.policy,
            errors: Vec::new(),
        };

        if request.do_assets {
            report.assets_copied = assets::copy_tree(
                &self.paths.assets(),
                &self.paths.output.join("assets"),
                &self.sink,
            )?;
        }

        if request.do_dependencies {
            let deps = dependencies::reload(
                &self.paths.templates(),
                &self.paths.components(),
                &self.registries,
                &self.sink,
            )?;
            if deps.broken > 0 || deps.removed > 0 {
                log!(self.sink => "deps"; "{} unreadable, {} dropped", deps.broken, deps.removed);
            }
            report.templates = deps.templates;
            report.components = deps.components;
        }

        if request.do_content || request.do_tags {
            let composer = Composer::new(&self.registries, self.sink.clone());

            if request.do_content {
                self.content_pass(&composer, &mut report, &mut failures)?;
            }

            if request.do_tags {
                let records: Vec<ContentRecord> = self.registries.content.values();
                let tags = TagIndexer::new(&composer, &self.paths.output, &self.sink).run(&records);
                report.tag_pages = tags.written;
                report.pages_removed += tags.removed;
                for err in tags.failures {
                    failures.push(err, &self.sink)?;
                }
            }
        }

        log!(self.sink => "build"; "{report} in {:.2?}", started.elapsed());

        if failures.errors.is_empty() {
            Ok(report)
        } else {
            Err(SiteError::Batch {
                failures: failures.errors,
            })
        }
    }

    /// Walk `content/` in file-name order, compiling markdown and copying the rest.
    fn content_pass(
        &self,
        composer: &Composer,
        report: &mut RebuildReport,
        failures: &mut Failures,
    ) -> SiteResult<()> {
        let root = self.paths.content();
        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
        // routes written this pass; their pages are never removed as stale
        let mut written: FxHashSet<String> = FxHashSet::default();
        let mut complete = true;

        if root.is_dir() {
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(source) => {
                        complete = false;
                        let path = source.path().unwrap_or(&root).to_path_buf();
                        failures.push(SiteError::Walk { path, source }, &self.sink)?;
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let result = if is_markdown(path) {
                    seen.insert(path.to_path_buf());
                    self.build_page(composer, path, &mut written, report)
                } else {
                    self.copy_content_file(&root, path, report)
                };

                if let Err(err) = result {
                    self.registries.content.delete(path);
                    failures.push(err, &self.sink)?;
                }
            }
        } else {
            log!(self.sink => "content"; "{} not found, skipping", root.display());
        }

        if complete {
            report.pages_removed = self.prune_records(&seen, &written);
        }
        Ok(())
    }

    /// Compile, compose and write one content file.
    ///
    /// An unpublished file only removes its stale page when no published
    /// file wrote the same route in this pass (`blog.md` vs `blog/index.md`).
    fn build_page(
        &self,
        composer: &Composer,
        path: &Path,
        written: &mut FxHashSet<String>,
        report: &mut RebuildReport,
    ) -> SiteResult<()> {
        let record = self.compiler.compile(path)?;
        let target = record.output_path(&self.paths.output);

        if !record.published {
            if !written.contains(&record.route) {
                remove_stale(&target, &self.sink);
            }
            report.unpublished += 1;
            return Ok(());
        }

        let html = composer.compose_record(&record)?;
        assets::write_file(&target, &html)?;
        written.insert(record.route);
        report.pages_written += 1;
        Ok(())
    }

    fn copy_content_file(&self, root: &Path, path: &Path, report: &mut RebuildReport) -> SiteResult<()> {
        let Ok(relative) = path.strip_prefix(root) else {
            return Ok(());
        };
        assets::copy_file(path, &self.paths.output.join(relative))?;
        report.files_copied += 1;
        Ok(())
    }

    /// Drop records of content files that no longer exist, with their pages.
    fn prune_records(&self, seen: &FxHashSet<PathBuf>, written: &FxHashSet<String>) -> usize {
        let store = &self.registries.content;
        let mut removed = 0;

        for path in store.keys() {
            if seen.contains(&path) {
                continue;
            }
            if let Some(record) = store.delete(&path) {
                if record.published && !written.contains(&record.route) {
                    remove_stale(&record.output_path(&self.paths.output), &self.sink);
                }
                removed += 1;
            }
        }
        removed
    }
}

/// Remove a generated page that should no longer exist.
fn remove_stale(page: &Path, sink: &Sink) {
    if !page.is_file() {
        return;
    }
    match fs::remove_file(page) {
        Ok(()) => log!(sink => "content"; "removed {}", page.display()),
        Err(err) => log!(sink => "error"; "cannot remove {}: {err}", page.display()),
    }
}

/// Delete the output directory before a clean build.
pub fn clean_output(output: &Path) -> SiteResult<()> {
    if output.exists() {
        fs::remove_dir_all(output).map_err(|err| SiteError::write(output, err))?;
    }
    Ok(())
}
