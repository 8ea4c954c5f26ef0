use std::time::Duration;

use chrono::Utc;
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{ArchiveResultKind, Effect, Msg, Theme};
use harvester_engine::{
    ArchiveJob, EngineEvent, EngineHandle, JobOutcome, PlatformError, PlatformMessage,
};

/// Carries effects out against the engine.
pub struct EffectRunner<'a> {
    engine: &'a EngineHandle,
    scroll_interval: Duration,
}

impl<'a> EffectRunner<'a> {
    pub fn new(engine: &'a EngineHandle, scroll_interval: Duration) -> Self {
        Self {
            engine,
            scroll_interval,
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartArchive {
                    job_id,
                    urls,
                    collection_title,
                } => {
                    engine_info!("StartArchive job_id={} urls={}", job_id, urls.len());
                    self.engine.start_archive(ArchiveJob {
                        job_id,
                        urls,
                        collection_title,
                        stamp: Utc::now().timestamp_millis().to_string(),
                    });
                }
                Effect::CancelArchive { job_id } => self.engine.cancel_archive(job_id),
                Effect::StartAutoScroll => self.engine.start_auto_scroll(self.scroll_interval),
                Effect::StopAutoScroll => self.engine.stop_auto_scroll(),
                Effect::ApplyTheme(theme) => match theme_message(theme) {
                    Ok(json) => {
                        engine_debug!("no settings panel attached; {json} not delivered")
                    }
                    Err(err) => engine_warn!("could not encode theme {theme}: {err}"),
                },
                Effect::ShowComplete { entries } => {
                    println!("Download complete: {entries} items archived.");
                }
                Effect::ShowError(message) => {
                    engine_error!("{message}");
                    eprintln!("Download failed: {message}");
                }
            }
        }
    }
}

/// The settings-panel message for a theme change. The terminal host has no
/// panel to receive it.
pub fn theme_message(theme: Theme) -> Result<String, PlatformError> {
    PlatformMessage::SetTheme {
        theme: theme.to_string(),
    }
    .to_json()
}

/// Translates engine events that map directly onto state messages.
pub fn engine_event_to_msg(event: &EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::ArchiveProgress {
            job_id,
            processed,
            total,
        } => Some(Msg::ArchiveProgress {
            job_id: *job_id,
            processed: *processed,
            total: *total,
        }),
        EngineEvent::JobCompleted { job_id, result } => Some(Msg::ArchiveDone {
            job_id: *job_id,
            result: match result {
                Ok(JobOutcome::Saved { path, entries, .. }) => ArchiveResultKind::Saved {
                    filename: path.display().to_string(),
                    entries: *entries,
                },
                Ok(JobOutcome::Cancelled { .. }) => ArchiveResultKind::Cancelled,
                Err(failure_kind) => {
                    engine_warn!("Job {} failed: {}", job_id, failure_kind);
                    ArchiveResultKind::Failed(failure_kind.to_string())
                }
            },
        }),
        EngineEvent::ScrollTick | EngineEvent::Interrupted => None,
    }
}
