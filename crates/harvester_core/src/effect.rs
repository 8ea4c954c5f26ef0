use crate::{JobId, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartArchive {
        job_id: JobId,
        urls: Vec<String>,
        collection_title: Option<String>,
    },
    CancelArchive { job_id: JobId },
    StartAutoScroll,
    StopAutoScroll,
    ApplyTheme(Theme),
    ShowComplete { entries: usize },
    ShowError(String),
}
