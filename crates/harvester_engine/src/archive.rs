use std::io::{Cursor, Write};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::{extension_of, is_video_url};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::fetch::{MediaFetcher, ProgressSink};
use crate::filename::{archive_folder_name, entry_name};
use crate::platform::TabOpener;
use crate::{EngineEvent, JobId};

/// Bodies smaller than this are placeholder or error responses.
pub const DEFAULT_MIN_CONTENT_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub min_content_bytes: usize,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            min_content_bytes: DEFAULT_MIN_CONTENT_BYTES,
        }
    }
}

/// A snapshot of collected URLs. The position of a URL names its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    pub job_id: JobId,
    pub urls: Vec<String>,
    pub collection_title: Option<String>,
    pub stamp: String,
}

impl ArchiveJob {
    pub fn folder(&self) -> String {
        archive_folder_name(self.collection_title.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBlob {
    pub folder: String,
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
    pub skipped: usize,
    pub passed_through: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveRun {
    Completed(ArchiveBlob),
    Cancelled { processed: usize },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to add archive entry {name}: {source}")]
    Entry {
        name: String,
        source: zip::result::ZipError,
    },
    #[error("failed to write archive entry {name}: {source}")]
    Write {
        name: String,
        source: std::io::Error,
    },
    #[error("failed to finish archive: {0}")]
    Finish(zip::result::ZipError),
}

/// Fetches the job's URLs one at a time and packs them into a zip held in
/// memory.
pub struct ArchiveOrchestrator {
    fetcher: Arc<dyn MediaFetcher>,
    tabs: Arc<dyn TabOpener>,
    settings: ArchiveSettings,
}

impl ArchiveOrchestrator {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        tabs: Arc<dyn TabOpener>,
        settings: ArchiveSettings,
    ) -> Self {
        Self {
            fetcher,
            tabs,
            settings,
        }
    }

    pub async fn run(
        &self,
        job: &ArchiveJob,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<ArchiveRun, ArchiveError> {
        let folder = job.folder();
        let total = job.urls.len();
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entries = Vec::new();
        let mut skipped = 0;
        let mut passed_through = 0;
        let mut processed = 0;

        engine_info!("job {}: archiving {total} urls into {folder}", job.job_id);

        for (index, url) in job.urls.iter().enumerate() {
            if cancel.is_cancelled() {
                engine_info!("job {}: cancelled after {processed} items", job.job_id);
                return Ok(ArchiveRun::Cancelled { processed });
            }

            if is_video_url(url) {
                match self.tabs.open_background(url).await {
                    Ok(()) => passed_through += 1,
                    Err(err) => {
                        engine_warn!("job {}: passthrough for {url} failed: {err}", job.job_id);
                        skipped += 1;
                    }
                }
            } else {
                match self.fetcher.fetch(url, cancel).await {
                    Err(err) if err.is_cancelled() => {
                        engine_info!("job {}: fetch of {url} aborted", job.job_id);
                        return Ok(ArchiveRun::Cancelled { processed });
                    }
                    Err(err) => {
                        engine_warn!("job {}: skipping {url}: {err}", job.job_id);
                        skipped += 1;
                    }
                    Ok(output) => {
                        let content_type = output.metadata.content_type.as_deref();
                        if !is_media_content_type(content_type) {
                            engine_warn!(
                                "job {}: unexpected content type {content_type:?} for {url}",
                                job.job_id
                            );
                        }
                        if output.bytes.len() < self.settings.min_content_bytes {
                            engine_warn!(
                                "job {}: skipping {url}: {} bytes looks like a placeholder",
                                job.job_id,
                                output.bytes.len()
                            );
                            skipped += 1;
                        } else {
                            let ext = extension_of(url, content_type);
                            let name = entry_name(&folder, index, &job.stamp, ext);
                            writer
                                .start_file(name.as_str(), options)
                                .map_err(|source| ArchiveError::Entry {
                                    name: name.clone(),
                                    source,
                                })?;
                            writer
                                .write_all(&output.bytes)
                                .map_err(|source| ArchiveError::Write {
                                    name: name.clone(),
                                    source,
                                })?;
                            engine_debug!("job {}: added {name}", job.job_id);
                            entries.push(name);
                        }
                    }
                }
            }

            processed += 1;
            sink.emit(EngineEvent::ArchiveProgress {
                job_id: job.job_id,
                processed,
                total,
            });
        }

        if cancel.is_cancelled() {
            return Ok(ArchiveRun::Cancelled { processed });
        }

        let cursor = writer.finish().map_err(ArchiveError::Finish)?;
        engine_info!(
            "job {}: archive ready with {} entries ({skipped} skipped, {passed_through} passed through)",
            job.job_id,
            entries.len()
        );
        Ok(ArchiveRun::Completed(ArchiveBlob {
            folder,
            bytes: cursor.into_inner(),
            entries,
            skipped,
            passed_through,
        }))
    }
}

fn is_media_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase())
        .is_some_and(|ct| ct.starts_with("image/") || ct.starts_with("video/"))
}
