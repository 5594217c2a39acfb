//! Rebuild requests and the two-state rebuild scheduler.
//!
//! # State Machine
//!
//! ```text
//!            submit(request)
//!   ┌──────┐ ───────────────►  ┌────────────┐
//!   │ Idle │                   │ Rebuilding │ ◄─┐ queued request merged
//!   └──────┘ ◄───────────────  └────────────┘ ──┘ and run next
//!              queue empty
//! ```
//!
//! A request submitted while a pass is running is merged (flag union) into a
//! single queued request, which runs as soon as the current pass finishes.
//! Passes never overlap.

use crate::{
    error::SiteResult,
    log,
    logger::Sink,
    site::{RebuildReport, Site},
    utils::category::{Classification, FileCategory, categorize_path},
};
use parking_lot::Mutex;
use std::path::Path;

// ============================================================================
// Rebuild Request
// ============================================================================

/// Which phases a rebuild pass runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildRequest {
    pub do_assets: bool,
    pub do_dependencies: bool,
    pub do_content: bool,
    pub do_tags: bool,
}

impl RebuildRequest {
    /// Every phase. Used at startup and for unclassifiable paths.
    pub const fn all() -> Self {
        Self {
            do_assets: true,
            do_dependencies: true,
            do_content: true,
            do_tags: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            do_assets: false,
            do_dependencies: false,
            do_content: false,
            do_tags: false,
        }
    }

    pub const fn is_empty(&self) -> bool {
        !(self.do_assets || self.do_dependencies || self.do_content || self.do_tags)
    }

    /// Flag union.
    pub const fn merge(self, other: Self) -> Self {
        Self {
            do_assets: self.do_assets || other.do_assets,
            do_dependencies: self.do_dependencies || other.do_dependencies,
            do_content: self.do_content || other.do_content,
            do_tags: self.do_tags || other.do_tags,
        }
    }

    /// Phases affected by a change in `category`.
    pub const fn for_category(category: FileCategory) -> Self {
        match category {
            FileCategory::Asset => Self {
                do_assets: true,
                ..Self::none()
            },
            FileCategory::Component | FileCategory::Template => Self {
                do_dependencies: true,
                do_content: true,
                do_tags: true,
                ..Self::none()
            },
            FileCategory::Content => Self {
                do_content: true,
                do_tags: true,
                ..Self::none()
            },
            FileCategory::Unknown => Self::none(),
        }
    }

    pub const fn from_classification(classification: Classification) -> Self {
        match classification {
            Classification::Category(category) => Self::for_category(category),
            Classification::Fallback => Self::all(),
        }
    }

    /// Merged request for a batch of changed paths.
    pub fn for_paths<'a>(paths: impl IntoIterator<Item = &'a Path>, source_root: &Path) -> Self {
        paths
            .into_iter()
            .map(|path| Self::from_classification(categorize_path(path, source_root)))
            .fold(Self::none(), Self::merge)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Rebuilding,
}

/// Serializes rebuild passes over one [`Site`].
pub struct Scheduler {
    site: Site,
    state: Mutex<SchedulerState>,
    queued: Mutex<Option<RebuildRequest>>,
    sink: Sink,
}

impl Scheduler {
    pub fn new(site: Site, sink: Sink) -> Self {
        Self {
            site,
            state: Mutex::new(SchedulerState::Idle),
            queued: Mutex::new(None),
            sink,
        }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Run every phase once.
    pub fn startup(&self) -> SiteResult<RebuildReport> {
        self.submit(RebuildRequest::all())
            .unwrap_or_else(|| Ok(RebuildReport::default()))
    }

    /// Run `request`, then anything queued meanwhile.
    ///
    /// Returns `None` when a pass is already running: the request was merged
    /// into the queue and the running caller will execute it. Otherwise returns
    /// the result of the last pass run.
    pub fn submit(&self, request: RebuildRequest) -> Option<SiteResult<RebuildReport>> {
        {
            // lock order: state, then queued
            let mut state = self.state.lock();
            if *state == SchedulerState::Rebuilding {
                let mut queued = self.queued.lock();
                *queued = Some(queued.map_or(request, |pending| pending.merge(request)));
                return None;
            }
            *state = SchedulerState::Rebuilding;
        }

        let mut next = request;
        loop {
            let result = self.run(next);

            let mut state = self.state.lock();
            match self.queued.lock().take() {
                Some(pending) => {
                    drop(state);
                    log!(self.sink => "schedule"; "running queued rebuild");
                    if let Err(err) = &result {
                        log!(self.sink => "error"; "{err}");
                    }
                    next = pending;
                }
                None => {
                    *state = SchedulerState::Idle;
                    return Some(result);
                }
            }
        }
    }

    fn run(&self, request: RebuildRequest) -> SiteResult<RebuildReport> {
        if request.is_empty() {
            return Ok(RebuildReport::default());
        }
        self.site.rebuild(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ErrorPolicy, MarkdownConfig},
        logger::NullSink,
        site::SitePaths,
    };
    use std::{fs, sync::Arc, thread};
    use tempfile::TempDir;

    #[test]
    fn test_classification_table() {
        let component = RebuildRequest::for_category(FileCategory::Component);
        assert!(!component.do_assets);
        assert!(component.do_dependencies && component.do_content && component.do_tags);
        assert_eq!(component, RebuildRequest::for_category(FileCategory::Template));

        let asset = RebuildRequest::for_category(FileCategory::Asset);
        assert_eq!(
            asset,
            RebuildRequest {
                do_assets: true,
                ..RebuildRequest::none()
            }
        );

        let content = RebuildRequest::for_category(FileCategory::Content);
        assert!(content.do_content && content.do_tags);
        assert!(!content.do_dependencies && !content.do_assets);

        assert!(RebuildRequest::for_category(FileCategory::Unknown).is_empty());
        assert_eq!(
            RebuildRequest::from_classification(Classification::Fallback),
            RebuildRequest::all()
        );
    }

    #[test]
    fn test_for_paths_merges_batch() {
        let root = Path::new("/nonexistent-root/src");
        let request = RebuildRequest::for_paths(
            [
                Path::new("/nonexistent-root/src/assets/a.css"),
                Path::new("/nonexistent-root/src/content/post.md"),
            ],
            root,
        );
        assert!(request.do_assets && request.do_content && request.do_tags);
        assert!(!request.do_dependencies);

        let outside = RebuildRequest::for_paths([Path::new("/tmp/x")], root);
        assert_eq!(outside, RebuildRequest::all());
        assert!(RebuildRequest::for_paths(std::iter::empty(), root).is_empty());
    }

    fn scheduler(dir: &TempDir) -> Scheduler {
        let sink: Sink = Arc::new(NullSink);
        let site = Site::new(
            SitePaths::new(dir.path().join("src"), dir.path().join("public")),
            &MarkdownConfig::default(),
            ErrorPolicy::Continue,
            sink.clone(),
        );
        Scheduler::new(site, sink)
    }

    #[test]
    fn test_submit_runs_and_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/assets")).unwrap();
        fs::write(dir.path().join("src/assets/a.css"), "a").unwrap();
        let scheduler = scheduler(&dir);

        let report = scheduler.startup().unwrap();
        assert_eq!(report.assets_copied, 1);
        assert_eq!(*scheduler.state.lock(), SchedulerState::Idle);

        let empty = scheduler.submit(RebuildRequest::none()).unwrap().unwrap();
        assert_eq!(empty, RebuildReport::default());
    }

    #[test]
    fn test_request_while_rebuilding_is_queued_and_merged() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir);

        *scheduler.state.lock() = SchedulerState::Rebuilding;
        let content = RebuildRequest::for_category(FileCategory::Content);
        let asset = RebuildRequest::for_category(FileCategory::Asset);
        assert!(scheduler.submit(content).is_none());
        assert!(scheduler.submit(asset).is_none());
        assert_eq!(*scheduler.queued.lock(), Some(content.merge(asset)));
    }

    #[test]
    fn test_queued_request_runs_after_current_pass() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/assets")).unwrap();
        fs::write(dir.path().join("src/assets/a.css"), "a").unwrap();
        let scheduler = Arc::new(scheduler(&dir));

        // a queued request left behind by a concurrent submitter is drained
        *scheduler.queued.lock() = Some(RebuildRequest::for_category(FileCategory::Asset));
        let result = scheduler.submit(RebuildRequest::none()).unwrap().unwrap();
        assert_eq!(result.assets_copied, 1);
        assert!(scheduler.queued.lock().is_none());
        assert_eq!(*scheduler.state.lock(), SchedulerState::Idle);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    scheduler.submit(RebuildRequest::all());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*scheduler.state.lock(), SchedulerState::Idle);
        assert!(scheduler.queued.lock().is_none());
    }
}
