use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::archive::{ArchiveJob, ArchiveOrchestrator, ArchiveRun, ArchiveSettings};
use crate::fetch::{ChannelProgressSink, FetchSettings, MediaFetcher, ProgressSink, ReqwestFetcher};
use crate::filename::archive_filename;
use crate::platform::{
    DownloadService, FsDownloadService, PassthroughTabs, PlatformError, SavePayload,
    DEFAULT_TAB_GRACE,
};
use crate::{EngineEvent, FailureKind, FetchError, FetchOutput, JobId, JobOutcome};

pub const DEFAULT_START_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub fetch: FetchSettings,
    pub archive: ArchiveSettings,
    pub output_dir: PathBuf,
    /// Delay before a job starts fetching, so late discovery can settle.
    pub start_grace: Duration,
    pub tab_grace: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            archive: ArchiveSettings::default(),
            output_dir: PathBuf::from("."),
            start_grace: DEFAULT_START_GRACE,
            tab_grace: DEFAULT_TAB_GRACE,
        }
    }
}

/// Runs one archive job end to end: grace period, orchestration, save.
pub struct JobRunner {
    orchestrator: ArchiveOrchestrator,
    downloads: Arc<dyn DownloadService>,
    start_grace: Duration,
}

impl JobRunner {
    pub fn new(
        orchestrator: ArchiveOrchestrator,
        downloads: Arc<dyn DownloadService>,
        start_grace: Duration,
    ) -> Self {
        Self {
            orchestrator,
            downloads,
            start_grace,
        }
    }

    pub async fn run(
        &self,
        job: &ArchiveJob,
        cancel: CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<JobOutcome, FailureKind> {
        // The token is cancelled on every exit so an in-flight request never
        // outlives its job.
        let _guard = cancel.clone().drop_guard();

        tokio::select! {
            _ = cancel.cancelled() => {
                engine_info!("job {} cancelled before start", job.job_id);
                return Ok(JobOutcome::Cancelled { processed: 0 });
            }
            _ = tokio::time::sleep(self.start_grace) => {}
        }

        let run = self
            .orchestrator
            .run(job, &cancel, sink)
            .await
            .map_err(|err| {
                engine_error!("job {} failed: {err}", job.job_id);
                FailureKind::Archive(err.to_string())
            })?;

        match run {
            ArchiveRun::Cancelled { processed } => Ok(JobOutcome::Cancelled { processed }),
            ArchiveRun::Completed(blob) => {
                let filename = archive_filename(&blob.folder);
                let entries = blob.entries.len();
                let path = self
                    .downloads
                    .save(SavePayload::Bytes(blob.bytes.into()), &filename)
                    .await
                    .map_err(|err| {
                        engine_error!("job {}: saving {filename} failed: {err}", job.job_id);
                        FailureKind::SaveRejected(err.to_string())
                    })?;
                Ok(JobOutcome::Saved {
                    path,
                    entries,
                    skipped: blob.skipped,
                })
            }
        }
    }
}

enum EngineCommand {
    StartArchive(ArchiveJob),
    CancelArchive { job_id: JobId },
    StartAutoScroll { interval: Duration },
    StopAutoScroll,
    WatchInterrupt,
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    runtime: tokio::runtime::Handle,
    tabs: Arc<PassthroughTabs>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> std::io::Result<Self> {
        let fetcher: Arc<dyn MediaFetcher> = Arc::new(ReqwestFetcher::new(settings.fetch.clone()));
        let downloads: Arc<dyn DownloadService> =
            Arc::new(FsDownloadService::new(settings.output_dir.clone(), fetcher.clone()));
        let tabs = Arc::new(PassthroughTabs::new(downloads.clone(), settings.tab_grace));
        let orchestrator =
            ArchiveOrchestrator::new(fetcher.clone(), tabs.clone(), settings.archive.clone());
        let runner = Arc::new(JobRunner::new(orchestrator, downloads, settings.start_grace));
        Self::with_parts(runner, tabs, fetcher)
    }

    /// Builds a handle around already assembled services.
    pub fn with_parts(
        runner: Arc<JobRunner>,
        tabs: Arc<PassthroughTabs>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let handle = runtime.handle().clone();

        let loop_tabs = tabs.clone();
        thread::spawn(move || command_loop(runtime, runner, loop_tabs, cmd_rx, event_tx));

        Ok(Self {
            cmd_tx,
            event_rx,
            runtime: handle,
            tabs,
            fetcher,
        })
    }

    pub fn start_archive(&self, job: ArchiveJob) {
        let _ = self.cmd_tx.send(EngineCommand::StartArchive(job));
    }

    pub fn cancel_archive(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelArchive { job_id });
    }

    pub fn start_auto_scroll(&self, interval: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::StartAutoScroll { interval });
    }

    pub fn stop_auto_scroll(&self) {
        let _ = self.cmd_tx.send(EngineCommand::StopAutoScroll);
    }

    /// Reports Ctrl-C as [`EngineEvent::Interrupted`] instead of exiting.
    pub fn watch_interrupt(&self) {
        let _ = self.cmd_tx.send(EngineCommand::WatchInterrupt);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Fetches one document on the engine runtime, blocking the caller.
    pub fn fetch_blocking(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let fetcher = self.fetcher.clone();
        let url = url.to_string();
        self.runtime
            .block_on(async move { fetcher.fetch(&url, &CancellationToken::new()).await })
    }

    /// Blocks until every background-tab download has finished and returns
    /// the ones that failed.
    pub fn wait_for_passthroughs(&self) -> Vec<PlatformError> {
        let tabs = self.tabs.clone();
        self.runtime.block_on(async move { tabs.wait_idle().await })
    }
}

fn command_loop(
    runtime: tokio::runtime::Runtime,
    runner: Arc<JobRunner>,
    tabs: Arc<PassthroughTabs>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut active: Option<(JobId, CancellationToken)> = None;
    let mut scroll: Option<CancellationToken> = None;
    let mut watching_interrupt = false;

    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::StartArchive(job) => {
                if let Some((running, token)) = &active {
                    if !token.is_cancelled() {
                        engine_warn!("job {} rejected: job {running} still running", job.job_id);
                        let _ = event_tx.send(EngineEvent::JobCompleted {
                            job_id: job.job_id,
                            result: Err(FailureKind::Archive(format!("job {running} is still running"))),
                        });
                        continue;
                    }
                }
                let token = CancellationToken::new();
                active = Some((job.job_id, token.clone()));
                let runner = runner.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let sink = ChannelProgressSink::new(event_tx.clone());
                    let result = runner.run(&job, token, &sink).await;
                    let _ = event_tx.send(EngineEvent::JobCompleted {
                        job_id: job.job_id,
                        result,
                    });
                });
            }
            EngineCommand::CancelArchive { job_id } => match &active {
                Some((running, token)) if *running == job_id => {
                    engine_info!("cancelling job {job_id}");
                    token.cancel();
                    tabs.cancel_all();
                }
                _ => engine_debug!("cancel for inactive job {job_id}"),
            },
            EngineCommand::StartAutoScroll { interval } => {
                if let Some(previous) = scroll.take() {
                    previous.cancel();
                }
                let token = CancellationToken::new();
                scroll = Some(token.clone());
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    // The first tick completes immediately.
                    ticker.tick().await;
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = ticker.tick() => {
                                if event_tx.send(EngineEvent::ScrollTick).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
            EngineCommand::StopAutoScroll => {
                if let Some(token) = scroll.take() {
                    token.cancel();
                }
            }
            EngineCommand::WatchInterrupt => {
                if watching_interrupt {
                    continue;
                }
                watching_interrupt = true;
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    while tokio::signal::ctrl_c().await.is_ok() {
                        if event_tx.send(EngineEvent::Interrupted).is_err() {
                            break;
                        }
                    }
                });
            }
        }
    }

    if let Some(token) = scroll {
        token.cancel();
    }
    engine_debug!("engine command loop stopped");
}
