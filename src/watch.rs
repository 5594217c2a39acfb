//! File system watcher for live rebuilds.
//!
//! Watches the whole source root and turns each debounced batch of changes
//! into one merged [`RebuildRequest`] for the [`Scheduler`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────┐    ┌──────────┐    ┌────────────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│    handle_changes()    │  │
//! │  │ events   │    │ (300ms)  │    │                        │  │
//! │  └──────────┘    └──────────┘    │  classify each path    │  │
//! │                                  │  merge requests        │  │
//! │                                  │  Scheduler::submit()   │  │
//! │                                  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed rebuild is logged and the loop keeps waiting for the next change.

use crate::{
    log,
    schedule::{RebuildRequest, Scheduler},
    utils::category::normalize_path,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Format path relative to root for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Merged request for a batch, ignoring temp files and anything under `output`.
fn request_for(paths: &[PathBuf], source: &Path, output: &Path) -> RebuildRequest {
    let relevant: Vec<PathBuf> = paths
        .iter()
        .filter(|path| !is_temp_file(path))
        .map(|path| normalize_path(path))
        .filter(|path| !path.starts_with(output))
        .collect();
    RebuildRequest::for_paths(relevant.iter().map(PathBuf::as_path), source)
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Classify one batch of changed paths and run the merged rebuild.
fn handle_changes(paths: &[PathBuf], scheduler: &Scheduler) {
    let site = scheduler.site().paths();
    let request = request_for(paths, &site.source, &site.output);
    if request.is_empty() {
        return;
    }

    let changed: Vec<_> = paths.iter().map(|p| rel_path(p, &site.source)).collect();
    log!("watch"; "{} changed, rebuilding...", changed.join(", "));

    match scheduler.submit(request) {
        Some(Ok(report)) => {
            log!("watch"; "rebuilt {} pages", report.pages_written);
            eprintln!(); // Blank line to separate rebuild sessions
        }
        Some(Err(err)) => {
            log!("watch"; "build failed");
            log!("error"; "{err}");
            eprintln!();
        }
        None => log!("watch"; "rebuild already running, queued"),
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher with debouncing and live rebuild.
pub fn watch_for_changes_blocking(scheduler: &Scheduler) -> Result<()> {
    let source = &scheduler.site().paths().source;

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(source, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", source.display()))?;
    log!("watch"; "{}", source.display());

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&debouncer.take(), scheduler);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            // Other cases: irrelevant events, timeout without ready, etc.
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/s/content/post.md~")));
        assert!(is_temp_file(Path::new("/s/content/.post.md.swp")));
        assert!(is_temp_file(Path::new("/s/content/post.bak")));
        assert!(!is_temp_file(Path::new("/s/content/post.md")));
    }

    #[test]
    fn test_request_for_merges_and_filters() {
        let source = Path::new("/nonexistent-root/src");
        let output = Path::new("/nonexistent-root/src/public");
        let paths = [
            PathBuf::from("/nonexistent-root/src/assets/a.css"),
            PathBuf::from("/nonexistent-root/src/content/post.md"),
            PathBuf::from("/nonexistent-root/src/public/index.html"),
            PathBuf::from("/nonexistent-root/src/templates/.post.html.swp"),
        ];

        let request = request_for(&paths, source, output);
        assert!(request.do_assets && request.do_content && request.do_tags);
        assert!(!request.do_dependencies);

        let only_output = request_for(&paths[2..], source, output);
        assert!(only_output.is_empty());
    }

    #[test]
    fn test_debouncer_batches_paths() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));

        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/s/b.md"))
            .add_path(PathBuf::from("/s/a.md"))
            .add_path(PathBuf::from("/s/a.md~"));
        debouncer.add(event);
        assert_eq!(debouncer.timeout(), Duration::from_millis(DEBOUNCE_MS));

        debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS));
        assert!(debouncer.ready());
        assert_eq!(
            debouncer.take(),
            vec![PathBuf::from("/s/a.md"), PathBuf::from("/s/b.md")]
        );
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_relevant_events() {
        assert!(is_relevant(&Event::new(EventKind::Create(CreateKind::File))));
        assert!(is_relevant(&Event::new(EventKind::Remove(RemoveKind::File))));
        assert!(!is_relevant(&Event::new(EventKind::Access(
            notify::event::AccessKind::Any
        ))));
    }
}
