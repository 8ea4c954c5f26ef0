//! Host platform services: saving finished files and the background-tab
//! passthrough used for assets that cannot be fetched in-process.
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_error, engine_info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetch::MediaFetcher;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::FetchError;

pub const DEFAULT_TAB_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("message could not be decoded: {0}")]
    Message(#[from] serde_json::Error),
    #[error("save rejected: {0}")]
    Rejected(String),
    #[error("passthrough of {url} failed: {reason}")]
    Passthrough { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavePayload {
    /// Finished content held in memory.
    Bytes(Bytes),
    /// Content the service retrieves itself.
    Url(String),
}

#[async_trait::async_trait]
pub trait DownloadService: Send + Sync {
    async fn save(
        &self,
        payload: SavePayload,
        suggested_filename: &str,
    ) -> Result<PathBuf, PlatformError>;
}

#[async_trait::async_trait]
pub trait TabOpener: Send + Sync {
    async fn open_background(&self, url: &str) -> Result<(), PlatformError>;
}

/// Saves into a local directory, never overwriting an existing file.
pub struct FsDownloadService {
    writer: AtomicFileWriter,
    fetcher: Arc<dyn MediaFetcher>,
}

impl FsDownloadService {
    pub fn new(output_dir: PathBuf, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            writer: AtomicFileWriter::new(output_dir),
            fetcher,
        }
    }
}

#[async_trait::async_trait]
impl DownloadService for FsDownloadService {
    async fn save(
        &self,
        payload: SavePayload,
        suggested_filename: &str,
    ) -> Result<PathBuf, PlatformError> {
        let bytes = match payload {
            SavePayload::Bytes(bytes) => bytes,
            SavePayload::Url(url) => {
                let output = self.fetcher.fetch(&url, &CancellationToken::new()).await?;
                output.bytes
            }
        };
        let path = self.writer.write_unique(suggested_filename, &bytes)?;
        engine_info!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

type PassthroughTask = JoinHandle<Result<(), PlatformError>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opens a URL "in a background tab": the download service retrieves it
/// out-of-band and the tab is closed after a grace period.
pub struct PassthroughTabs {
    downloads: Arc<dyn DownloadService>,
    grace: Duration,
    pending: Mutex<Vec<(String, PassthroughTask)>>,
    cancel: Mutex<CancellationToken>,
}

impl PassthroughTabs {
    pub fn new(downloads: Arc<dyn DownloadService>, grace: Duration) -> Self {
        Self {
            downloads,
            grace,
            pending: Mutex::new(Vec::new()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Aborts every passthrough started so far. Later ones are unaffected.
    pub fn cancel_all(&self) {
        let mut token = lock(&self.cancel);
        token.cancel();
        *token = CancellationToken::new();
    }

    /// Waits for every passthrough started so far and returns the ones that
    /// failed. Aborted passthroughs are not failures.
    pub async fn wait_idle(&self) -> Vec<PlatformError> {
        let tasks: Vec<(String, PassthroughTask)> = lock(&self.pending).drain(..).collect();
        let mut failures = Vec::new();
        for (url, task) in tasks {
            let reason = match task.await {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(err) => err.to_string(),
            };
            failures.push(PlatformError::Passthrough { url, reason });
        }
        failures
    }

    pub fn pending(&self) -> usize {
        lock(&self.pending)
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .count()
    }
}

#[async_trait::async_trait]
impl TabOpener for PassthroughTabs {
    async fn open_background(&self, url: &str) -> Result<(), PlatformError> {
        let downloads = self.downloads.clone();
        let grace = self.grace;
        let cancel = lock(&self.cancel).clone();
        let url = url.to_string();
        let filename = filename_from_url(&url);
        engine_debug!("opening background tab for {url}");

        let task_url = url.clone();
        let task = tokio::spawn(async move {
            let url = task_url;
            let saved = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    engine_info!("passthrough for {url} aborted");
                    return Ok(());
                }
                saved = downloads.save(SavePayload::Url(url.clone()), &filename) => saved,
            };
            match saved {
                Ok(path) => engine_info!("passthrough saved {url} to {}", path.display()),
                Err(err) => {
                    engine_error!("passthrough for {url} failed: {err}");
                    return Err(err);
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(grace) => {}
            }
            engine_debug!("closed background tab for {url}");
            Ok(())
        });

        lock(&self.pending).push((url, task));
        Ok(())
    }
}

/// Last path segment of `url`, or `download.bin` when there is none.
pub fn filename_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "download.bin".to_string())
}

/// Messages exchanged with the host page and the settings panel, as JSON
/// objects tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PlatformMessage {
    SetTheme { theme: String },
    Download { url: String, filename: String },
    OpenTabDownload { url: String },
}

impl PlatformMessage {
    pub fn to_json(&self) -> Result<String, PlatformError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, PlatformError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Routes download requests to the matching service. Theme messages are
/// handled by the caller and yield `Ok(None)` here.
pub async fn dispatch(
    message: PlatformMessage,
    downloads: &dyn DownloadService,
    tabs: &dyn TabOpener,
) -> Result<Option<PathBuf>, PlatformError> {
    match message {
        PlatformMessage::Download { url, filename } => downloads
            .save(SavePayload::Url(url), &filename)
            .await
            .map(Some),
        PlatformMessage::OpenTabDownload { url } => {
            tabs.open_background(&url).await?;
            Ok(None)
        }
        PlatformMessage::SetTheme { .. } => Ok(None),
    }
}
