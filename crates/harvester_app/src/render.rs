use harvester_core::{AppViewModel, ArchiveResultKind, MediaKind, SessionState, Theme};

const BAR_WIDTH: usize = 30;

struct Palette {
    filled: char,
    empty: char,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            filled: '#',
            empty: '-',
        },
        Theme::Dark => Palette {
            filled: '█',
            empty: '░',
        },
    }
}

pub fn progress_bar(percent: u8, theme: Theme) -> String {
    let palette = palette(theme);
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    let mut bar = String::with_capacity(BAR_WIDTH + 2);
    bar.push('[');
    bar.extend(std::iter::repeat(palette.filled).take(filled));
    bar.extend(std::iter::repeat(palette.empty).take(BAR_WIDTH - filled));
    bar.push(']');
    bar
}

/// Status lines for the current view.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if view.session == SessionState::Inactive {
        lines.push("session closed".to_string());
        return lines;
    }

    let mode = if view.discovery_live { "live" } else { "paused" };
    lines.push(format!(
        "discovery {mode}: {} media urls from {} pins",
        view.url_count, view.container_count
    ));
    if view.auto_scroll {
        lines.push(format!(
            "scrolling {} {}%",
            progress_bar(view.scroll_percent, view.theme),
            view.scroll_percent
        ));
    }
    if let Some(job) = &view.job {
        let status = if job.cancel_requested {
            "cancelling"
        } else {
            "downloading"
        };
        lines.push(format!(
            "{status} {} {}/{} ({}%)",
            progress_bar(job.percent, view.theme),
            job.processed,
            job.total,
            job.percent
        ));
    }
    match &view.last_result {
        Some(ArchiveResultKind::Saved { filename, entries }) => {
            lines.push(format!("saved {entries} items to {filename}"));
        }
        Some(ArchiveResultKind::Cancelled) => lines.push("download cancelled".to_string()),
        Some(ArchiveResultKind::Failed(_)) | None => {}
    }
    if let Some(error) = &view.error {
        lines.push(format!("error: {error}"));
    }
    lines
}

/// Review listing: one row per collected url.
pub fn render_review(view: &AppViewModel) -> Vec<String> {
    view.urls
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let kind = match row.kind {
                MediaKind::Image => "image",
                MediaKind::Video => "video",
            };
            format!("{:>4}  {kind:<6} {:<10} {}", index + 1, row.resolution, row.url)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvester_core::{update, AppState, Msg};
    use pretty_assertions::assert_eq;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0, Theme::Light), format!("[{}]", "-".repeat(30)));
        assert_eq!(
            progress_bar(50, Theme::Light),
            format!("[{}{}]", "#".repeat(15), "-".repeat(15))
        );
        assert_eq!(progress_bar(100, Theme::Dark), format!("[{}]", "█".repeat(30)));
    }

    #[test]
    fn renders_job_progress_and_counts() {
        let (mut state, _) = update(AppState::new(), Msg::StartSession);
        state.on_network_url("https://i.pinimg.com/originals/a.jpg");
        state.on_network_url("https://i.pinimg.com/originals/b.jpg");
        let (state, _) = update(state, Msg::ConfirmDownloadClicked);
        let (state, _) = update(
            state,
            Msg::ArchiveProgress {
                job_id: 1,
                processed: 1,
                total: 2,
            },
        );

        let lines = render(&state.view());

        assert_eq!(lines[0], "discovery paused: 2 media urls from 0 pins");
        assert!(lines[1].starts_with("downloading ["));
        assert!(lines[1].ends_with("1/2 (50%)"));
    }

    #[test]
    fn review_lists_urls_with_tier() {
        let (mut state, _) = update(AppState::new(), Msg::StartSession);
        state.on_network_url("https://i.pinimg.com/236x/a.jpg");

        let rows = render_review(&state.view());

        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("originals"));
        assert!(rows[0].ends_with("https://i.pinimg.com/originals/a.jpg"));
    }
}
