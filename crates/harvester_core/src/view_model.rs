use crate::{ArchiveResultKind, JobId, MediaKind, SessionState, Theme};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub review_open: bool,
    pub discovery_live: bool,
    pub url_count: usize,
    pub container_count: usize,
    pub urls: Vec<UrlRowView>,
    pub confirm_enabled: bool,
    pub job: Option<JobProgressView>,
    pub last_result: Option<ArchiveResultKind>,
    pub error: Option<String>,
    pub theme: Theme,
    pub auto_scroll: bool,
    pub scroll_percent: u8,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRowView {
    pub url: String,
    /// Badge text such as `originals` or `236x`.
    pub resolution: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgressView {
    pub job_id: JobId,
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
    pub cancel_requested: bool,
}
