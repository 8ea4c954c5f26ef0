use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use engine_logging::engine_info;
use harvester_core::Theme;

mod app;
mod config;
mod effects;
mod host;
mod render;

use crate::config::HarvestConfig;

/// Collects pin media from saved board snapshots and archives it as one zip.
#[derive(Debug, Parser)]
#[command(name = "harvester", version)]
#[command(about = "Pinterest board media harvester", long_about = None)]
struct Cli {
    /// Board snapshots (files or http/https URLs), one per scroll step.
    #[arg(required_unless_present = "print_config")]
    snapshots: Vec<String>,

    /// Config file; defaults to ./harvester.ron when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the archive is saved to.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reveal every snapshot at once instead of on the scroll timer.
    #[arg(long)]
    no_auto_scroll: bool,

    #[arg(long)]
    theme: Option<Theme>,

    /// error, warn, info, debug or trace.
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective config as RON and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut HarvestConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.no_auto_scroll {
            config.auto_scroll = false;
        }
        if let Some(theme) = self.theme {
            config.theme = theme.to_string();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = HarvestConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    if cli.print_config {
        println!("{}", config.to_ron()?);
        return Ok(ExitCode::SUCCESS);
    }

    engine_logging::initialize(config.log_target.into(), config.level(), &config.log_file);
    engine_info!(
        "harvesting {} snapshots into {}",
        cli.snapshots.len(),
        config.output_dir.display()
    );
    app::run(&config, cli.snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "harvester",
            "--no-auto-scroll",
            "--theme",
            "dark",
            "-o",
            "out",
            "board.html",
        ]);
        let mut config = HarvestConfig::default();
        cli.apply(&mut config);

        assert!(!config.auto_scroll);
        assert_eq!(config.theme(), Theme::Dark);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(cli.snapshots, vec!["board.html".to_string()]);
    }

    #[test]
    fn snapshots_are_required_unless_printing_config() {
        assert!(Cli::try_parse_from(["harvester"]).is_err());
        assert!(Cli::try_parse_from(["harvester", "--print-config"]).is_ok());
    }
}
