//! Harvester core: page model, discovery, canonicalization and the pure
//! session state machine. Nothing in here performs IO.
mod canonical;
mod collection;
mod discovery;
mod effect;
mod matcher;
mod msg;
mod page;
mod progress;
mod state;
mod update;
mod view_model;

pub use canonical::{
    accept, canonicalize, extension_of, is_valid, is_video_url, CanonicalUrl, MediaKind,
    ResolutionTier, ASSET_DOMAIN, IMAGE_HOST, VIDEO_HOST,
};
pub use collection::{AcceptedUrl, CollectionStore};
pub use discovery::{
    extract_raw_url, record, DiscoveryEngine, DiscoveryReport, ExtractionError, Recorded,
};
pub use effect::Effect;
pub use matcher::{ElementPattern, PatternSet, BOARD_PATTERNS, PIN_PATTERNS};
pub use msg::Msg;
pub use page::{NodeId, PageElement, PageNode, PageTree, TreeChange, WATCHED_ATTRIBUTES};
pub use progress::{discovery_count, percent, scroll_percent, SCROLL_TARGET_CONTAINERS};
pub use state::{ActiveJob, AppState, ArchiveResultKind, JobId, SessionState, Theme};
pub use update::update;
pub use view_model::{AppViewModel, JobProgressView, UrlRowView};
