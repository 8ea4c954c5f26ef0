use crate::progress::scroll_percent;
use crate::{AppState, ArchiveResultKind, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartSession => {
            if state.session() == SessionState::Inactive {
                state.start_session();
            }
            Vec::new()
        }
        Msg::EndSession => {
            let mut effects = Vec::new();
            if let Some(job) = state.job() {
                effects.push(Effect::CancelArchive { job_id: job.job_id });
            }
            if state.auto_scroll() {
                effects.push(Effect::StopAutoScroll);
            }
            state.end_session();
            effects
        }
        Msg::BeginDiscoveryClicked => {
            if state.session() == SessionState::Active {
                state.begin_discovery();
            }
            Vec::new()
        }
        Msg::OpenReviewClicked => {
            if state.session() == SessionState::Active {
                state.open_review();
            }
            Vec::new()
        }
        Msg::CloseReviewClicked => {
            state.close_review();
            Vec::new()
        }
        Msg::ConfirmDownloadClicked => match state.start_job() {
            Some((job_id, urls, collection_title)) => vec![Effect::StartArchive {
                job_id,
                urls,
                collection_title,
            }],
            None => Vec::new(),
        },
        Msg::CancelDownloadClicked => match state.request_cancel() {
            Some(job_id) => vec![Effect::CancelArchive { job_id }],
            None => Vec::new(),
        },
        Msg::ArchiveProgress {
            job_id,
            processed,
            total,
        } => {
            state.apply_progress(job_id, processed, total);
            Vec::new()
        }
        Msg::ArchiveDone { job_id, result } => {
            if !state.finish_job(job_id, result.clone()) {
                return (state, Vec::new());
            }
            match result {
                ArchiveResultKind::Saved { entries, .. } => vec![Effect::ShowComplete { entries }],
                ArchiveResultKind::Cancelled => Vec::new(),
                ArchiveResultKind::Failed(message) => vec![Effect::ShowError(message)],
            }
        }
        Msg::PassthroughFailed(message) => {
            state.record_error(&message);
            vec![Effect::ShowError(message)]
        }
        Msg::ToggleAutoScroll => {
            if state.toggle_auto_scroll() {
                vec![Effect::StartAutoScroll]
            } else {
                vec![Effect::StopAutoScroll]
            }
        }
        Msg::ScrollProgress { containers } => {
            state.set_scroll_percent(scroll_percent(containers));
            Vec::new()
        }
        Msg::SetTheme(theme) => {
            if state.set_theme(theme) {
                vec![Effect::ApplyTheme(theme)]
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
