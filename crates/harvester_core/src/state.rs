use std::fmt;
use std::str::FromStr;

use engine_logging::{engine_info, engine_warn};

use crate::collection::CollectionStore;
use crate::discovery::{DiscoveryEngine, DiscoveryReport, Recorded};
use crate::page::{NodeId, PageTree, TreeChange};
use crate::progress::percent;
use crate::view_model::{AppViewModel, JobProgressView, UrlRowView};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveResultKind {
    Saved { filename: String, entries: usize },
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub total: usize,
    pub processed: usize,
    pub cancel_requested: bool,
}

/// Page-session controller state: one collection, one discovery engine and at
/// most one archive job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    session: SessionState,
    review_open: bool,
    discovery_live: bool,
    collection: CollectionStore,
    discovery: DiscoveryEngine,
    job: Option<ActiveJob>,
    next_job_id: JobId,
    last_result: Option<ArchiveResultKind>,
    last_error: Option<String>,
    theme: Theme,
    auto_scroll: bool,
    scroll_percent: u8,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            session: self.session,
            review_open: self.review_open,
            discovery_live: self.discovery_live,
            url_count: self.collection.len(),
            container_count: self.collection.container_count(),
            urls: self
                .collection
                .log()
                .iter()
                .map(|entry| UrlRowView {
                    url: entry.url.clone(),
                    resolution: entry.tier.to_string(),
                    kind: entry.kind,
                })
                .collect(),
            confirm_enabled: self.job.is_none() && !self.collection.is_empty(),
            job: self.job.as_ref().map(|job| JobProgressView {
                job_id: job.job_id,
                processed: job.processed,
                total: job.total,
                percent: percent(job.processed, job.total),
                cancel_requested: job.cancel_requested,
            }),
            last_result: self.last_result.clone(),
            error: self.last_error.clone(),
            theme: self.theme,
            auto_scroll: self.auto_scroll,
            scroll_percent: self.scroll_percent,
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn collection(&self) -> &CollectionStore {
        &self.collection
    }

    pub fn discovery(&self) -> &DiscoveryEngine {
        &self.discovery
    }

    pub fn job(&self) -> Option<&ActiveJob> {
        self.job.as_ref()
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    // ---- tree events: these need the host tree, so they bypass `update` ----

    /// Treats the whole current document as freshly added.
    pub fn scan_existing(&mut self, tree: &PageTree) -> DiscoveryReport {
        self.on_document_changed(tree, &[TreeChange::ChildrenAdded(vec![tree.root()])])
    }

    pub fn on_document_changed(&mut self, tree: &PageTree, changes: &[TreeChange]) -> DiscoveryReport {
        let report = self
            .discovery
            .on_document_changed(tree, changes, &mut self.collection);
        self.note_report(&report);
        report
    }

    pub fn on_visible(&mut self, tree: &mut PageTree, container: NodeId) -> DiscoveryReport {
        let report = self
            .discovery
            .on_visible(tree, container, &mut self.collection);
        self.note_report(&report);
        report
    }

    pub fn on_all_visible(&mut self, tree: &mut PageTree) -> DiscoveryReport {
        let report = self.discovery.on_all_visible(tree, &mut self.collection);
        self.note_report(&report);
        report
    }

    pub fn on_network_url(&mut self, raw: &str) -> Recorded {
        let recorded = self.discovery.on_network_url(raw, &mut self.collection);
        if recorded == Recorded::Accepted {
            self.dirty = true;
        }
        recorded
    }

    fn note_report(&mut self, report: &DiscoveryReport) {
        if !report.accepted.is_empty() {
            self.dirty = true;
        }
    }

    // ---- transitions driven by `update` ----

    pub(crate) fn start_session(&mut self) {
        self.session = SessionState::Active;
        self.discovery.connect();
        self.dirty = true;
    }

    pub(crate) fn end_session(&mut self) {
        self.discovery.disconnect();
        self.session = SessionState::Inactive;
        self.review_open = false;
        self.discovery_live = false;
        self.auto_scroll = false;
        self.job = None;
        self.dirty = true;
    }

    pub(crate) fn begin_discovery(&mut self) {
        if !self.discovery.is_connected() {
            self.discovery.connect();
        }
        if !self.discovery_live {
            self.discovery_live = true;
            self.dirty = true;
        }
    }

    pub(crate) fn open_review(&mut self) {
        self.collection.clear();
        self.review_open = true;
        self.last_error = None;
        self.dirty = true;
    }

    pub(crate) fn close_review(&mut self) {
        if self.review_open || self.discovery_live {
            self.review_open = false;
            self.discovery_live = false;
            self.dirty = true;
        }
    }

    /// Snapshots the URL set into a new job unless one is already running.
    pub(crate) fn start_job(&mut self) -> Option<(JobId, Vec<String>, Option<String>)> {
        if self.job.is_some() || self.collection.is_empty() {
            return None;
        }
        self.next_job_id += 1;
        let job_id = self.next_job_id;
        let urls = self.collection.snapshot();
        engine_info!("archive job {job_id} snapshot: {} urls", urls.len());
        self.job = Some(ActiveJob {
            job_id,
            total: urls.len(),
            processed: 0,
            cancel_requested: false,
        });
        self.review_open = false;
        self.last_result = None;
        self.dirty = true;
        let title = self.discovery.collection_title().map(str::to_string);
        Some((job_id, urls, title))
    }

    pub(crate) fn request_cancel(&mut self) -> Option<JobId> {
        let job = self.job.as_mut()?;
        if job.cancel_requested {
            return None;
        }
        job.cancel_requested = true;
        self.dirty = true;
        Some(job.job_id)
    }

    pub(crate) fn apply_progress(&mut self, job_id: JobId, processed: usize, total: usize) {
        match self.job.as_mut() {
            Some(job) if job.job_id == job_id => {
                job.processed = processed.max(job.processed);
                job.total = total;
                self.dirty = true;
            }
            _ => engine_warn!("progress for unknown job {job_id}"),
        }
    }

    /// Cleanup on every job exit path. Returns `false` for a stale job id.
    pub(crate) fn finish_job(&mut self, job_id: JobId, result: ArchiveResultKind) -> bool {
        if self.job.as_ref().map(|job| job.job_id) != Some(job_id) {
            engine_warn!("completion for unknown job {job_id}");
            return false;
        }
        self.job = None;
        self.discovery.disconnect();
        self.discovery_live = false;
        if let ArchiveResultKind::Failed(message) = &result {
            self.last_error = Some(message.clone());
        }
        self.last_result = Some(result);
        self.dirty = true;
        true
    }

    pub(crate) fn record_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.dirty = true;
    }

    pub(crate) fn toggle_auto_scroll(&mut self) -> bool {
        self.auto_scroll = !self.auto_scroll;
        self.dirty = true;
        self.auto_scroll
    }

    pub(crate) fn set_scroll_percent(&mut self, value: u8) {
        if self.scroll_percent != value {
            self.scroll_percent = value;
            self.dirty = true;
        }
    }

    /// Returns `false` when the theme was already active.
    pub(crate) fn set_theme(&mut self, theme: Theme) -> bool {
        if self.theme == theme {
            return false;
        }
        self.theme = theme;
        self.dirty = true;
        true
    }
}
