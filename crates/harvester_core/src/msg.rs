use crate::{ArchiveResultKind, JobId, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A page session begins; discovery starts listening.
    StartSession,
    /// The page goes away; any running job is cancelled.
    EndSession,
    /// User asked for live discovery (idempotent).
    BeginDiscoveryClicked,
    /// User opened the review panel; starts a fresh URL log.
    OpenReviewClicked,
    CloseReviewClicked,
    /// User confirmed the download of everything collected so far.
    ConfirmDownloadClicked,
    /// User cancelled the running archive job.
    CancelDownloadClicked,
    ToggleAutoScroll,
    /// Auto-scroll timer observed this many containers in the page.
    ScrollProgress { containers: usize },
    /// Engine finished one item (fetched, skipped or passed through).
    ArchiveProgress {
        job_id: JobId,
        processed: usize,
        total: usize,
    },
    /// Engine finished the job.
    ArchiveDone {
        job_id: JobId,
        result: ArchiveResultKind,
    },
    /// A background-tab download failed after its job finished.
    PassthroughFailed(String),
    /// Theme preference pushed from the control surface.
    SetTheme(Theme),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
