use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ArchiveProgress {
        job_id: JobId,
        processed: usize,
        total: usize,
    },
    JobCompleted {
        job_id: JobId,
        result: Result<JobOutcome, FailureKind>,
    },
    ScrollTick,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved {
        path: PathBuf,
        entries: usize,
        skipped: usize,
    },
    Cancelled {
        processed: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Cancelled,
    Network,
    /// Building or serializing the archive failed.
    Archive(String),
    /// The download service refused the finished archive.
    SaveRejected(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Archive(message) => write!(f, "archive error: {message}"),
            FailureKind::SaveRejected(message) => write!(f, "save rejected: {message}"),
        }
    }
}
