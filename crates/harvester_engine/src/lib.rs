//! Harvester engine: media fetching, archive building and platform services.
mod archive;
mod engine;
mod fetch;
mod filename;
mod html;
mod network;
mod persist;
mod platform;
mod types;

pub use archive::{
    ArchiveBlob, ArchiveError, ArchiveJob, ArchiveOrchestrator, ArchiveRun, ArchiveSettings,
    DEFAULT_MIN_CONTENT_BYTES,
};
pub use engine::{EngineHandle, EngineSettings, JobRunner, DEFAULT_START_GRACE};
pub use fetch::{
    ChannelProgressSink, FetchSettings, MediaFetcher, ProgressSink, ReqwestFetcher,
    DEFAULT_USER_AGENT,
};
pub use filename::{archive_filename, archive_folder_name, entry_name, FALLBACK_FOLDER};
pub use html::{decode_html, graft_document, DecodeError, DecodedHtml, GraftOutcome};
pub use network::scan_asset_urls;
pub use persist::{ensure_output_dir, uniquify, AtomicFileWriter, PersistError};
pub use platform::{
    dispatch, filename_from_url, DownloadService, FsDownloadService, PassthroughTabs,
    PlatformError, PlatformMessage, SavePayload, TabOpener, DEFAULT_TAB_GRACE,
};
pub use types::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, JobId, JobOutcome};
