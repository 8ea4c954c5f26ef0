use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::{update, AppState, ArchiveResultKind, Msg, PIN_PATTERNS};
use harvester_engine::{decode_html, EngineEvent, EngineHandle};

use crate::config::HarvestConfig;
use crate::effects::{engine_event_to_msg, EffectRunner};
use crate::host::{Reveal, SnapshotHost};
use crate::render::{render, render_review};

const EVENT_POLL: Duration = Duration::from_millis(200);

fn step(state: &mut AppState, msg: Msg, effects: &EffectRunner<'_>) {
    engine_debug!("msg {msg:?}");
    let (next, pending) = update(std::mem::take(state), msg);
    *state = next;
    effects.run(pending);
    render_if_dirty(state);
}

fn render_if_dirty(state: &mut AppState) {
    if state.consume_dirty() {
        for line in render(&state.view()) {
            println!("{line}");
        }
    }
}

/// Feeds one scroll step into discovery. Returns the containers now in the page.
pub fn absorb(state: &mut AppState, host: &mut SnapshotHost, reveal: &Reveal) -> usize {
    let report = state.on_document_changed(host.tree(), &reveal.changes);
    engine_debug!(
        "batch: {} registered, {} accepted, {} rejected",
        report.registered,
        report.accepted.len(),
        report.rejected
    );
    state.on_all_visible(host.tree_mut());
    for url in &reveal.network_urls {
        state.on_network_url(url);
    }
    let tree = host.tree();
    PIN_PATTERNS.find_all(tree, tree.root()).len()
}

pub fn load_local(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    Ok(decode_html(&bytes, None)?.html)
}

fn load_source(engine: &EngineHandle, source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let output = engine
            .fetch_blocking(source)
            .with_context(|| format!("fetching snapshot {source}"))?;
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref())?;
        engine_debug!("{source} decoded as {}", decoded.encoding_label);
        Ok(decoded.html)
    } else {
        load_local(Path::new(source))
    }
}

/// Reveals the next snapshot, if any, and reports the container count.
fn scroll_once(
    state: &mut AppState,
    host: &mut SnapshotHost,
    engine: &EngineHandle,
    effects: &EffectRunner<'_>,
) -> Result<bool> {
    let mut load = |source: &str| load_source(engine, source);
    let Some(reveal) = host.reveal_next(&mut load)? else {
        return Ok(false);
    };
    let containers = absorb(state, host, &reveal);
    step(state, Msg::ScrollProgress { containers }, effects);
    Ok(true)
}

/// One page session over `snapshots`: discover, review, archive.
pub fn run(config: &HarvestConfig, snapshots: Vec<String>) -> Result<ExitCode> {
    let engine = EngineHandle::new(config.engine_settings()).context("starting engine")?;
    let effects = EffectRunner::new(&engine, config.scroll_interval());
    let mut host = SnapshotHost::new(snapshots);
    let mut state = AppState::new();

    engine.watch_interrupt();
    step(&mut state, Msg::StartSession, &effects);
    step(&mut state, Msg::SetTheme(config.theme()), &effects);
    step(&mut state, Msg::OpenReviewClicked, &effects);
    step(&mut state, Msg::BeginDiscoveryClicked, &effects);

    let mut interrupted = false;
    if scroll_once(&mut state, &mut host, &engine, &effects)? && host.has_more() {
        if config.auto_scroll {
            step(&mut state, Msg::ToggleAutoScroll, &effects);
            while host.has_more() {
                match engine.recv_timeout(config.scroll_interval() * 4) {
                    Some(EngineEvent::ScrollTick) => {
                        scroll_once(&mut state, &mut host, &engine, &effects)?;
                    }
                    Some(EngineEvent::Interrupted) => {
                        interrupted = true;
                        break;
                    }
                    Some(other) => engine_warn!("unexpected event while scrolling: {other:?}"),
                    None => engine_debug!("waiting for scroll tick"),
                }
            }
            if state.auto_scroll() {
                step(&mut state, Msg::ToggleAutoScroll, &effects);
            }
        } else {
            while scroll_once(&mut state, &mut host, &engine, &effects)? {}
        }
    }
    render_if_dirty(&mut state);

    if interrupted {
        engine_info!("interrupted during discovery");
        step(&mut state, Msg::EndSession, &effects);
        return Ok(ExitCode::from(130));
    }

    let view = state.view();
    if view.review_open {
        println!("{} media urls collected:", view.url_count);
        for line in render_review(&view) {
            println!("{line}");
        }
    }
    if !view.confirm_enabled {
        println!("Nothing collected.");
        step(&mut state, Msg::EndSession, &effects);
        return Ok(ExitCode::SUCCESS);
    }

    step(&mut state, Msg::ConfirmDownloadClicked, &effects);
    while state.job().is_some() {
        match engine.recv_timeout(EVENT_POLL) {
            Some(EngineEvent::Interrupted) => {
                step(&mut state, Msg::CancelDownloadClicked, &effects);
            }
            Some(event) => {
                if let Some(msg) = engine_event_to_msg(&event) {
                    step(&mut state, msg, &effects);
                }
            }
            None => {}
        }
    }

    let failures = engine.wait_for_passthroughs();
    for failure in &failures {
        step(&mut state, Msg::PassthroughFailed(failure.to_string()), &effects);
    }
    let outcome = state.view().last_result;
    step(&mut state, Msg::EndSession, &effects);

    Ok(exit_code(outcome.as_ref(), failures.len()))
}

fn exit_code(outcome: Option<&ArchiveResultKind>, failed_passthroughs: usize) -> ExitCode {
    match outcome {
        Some(ArchiveResultKind::Failed(_)) => ExitCode::FAILURE,
        Some(ArchiveResultKind::Cancelled) => ExitCode::from(130),
        Some(ArchiveResultKind::Saved { .. }) | None if failed_passthroughs > 0 => {
            ExitCode::FAILURE
        }
        Some(ArchiveResultKind::Saved { .. }) | None => ExitCode::SUCCESS,
    }
}
