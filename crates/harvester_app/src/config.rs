use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::{engine_warn, LogDestination};
use harvester_core::Theme;
use harvester_engine::{ArchiveSettings, EngineSettings, FetchSettings, DEFAULT_USER_AGENT};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "harvester.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogTarget {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Settings read from `harvester.ron`. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub output_dir: PathBuf,
    pub log_target: LogTarget,
    pub log_level: String,
    pub log_file: PathBuf,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_bytes: u64,
    pub min_content_bytes: usize,
    pub user_agent: String,
    pub start_grace_ms: u64,
    pub tab_grace_ms: u64,
    pub scroll_interval_ms: u64,
    pub auto_scroll: bool,
    pub theme: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        let engine = EngineSettings::default();
        Self {
            output_dir: PathBuf::from("downloads"),
            log_target: LogTarget::default(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("harvester.log"),
            connect_timeout_ms: fetch.connect_timeout.as_millis() as u64,
            request_timeout_ms: fetch.request_timeout.as_millis() as u64,
            max_bytes: fetch.max_bytes,
            min_content_bytes: ArchiveSettings::default().min_content_bytes,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            start_grace_ms: engine.start_grace.as_millis() as u64,
            tab_grace_ms: engine.tab_grace.as_millis() as u64,
            scroll_interval_ms: 3_000,
            auto_scroll: true,
            theme: Theme::default().to_string(),
        }
    }
}

impl HarvestConfig {
    /// Reads `path`, or `harvester.ron` in the working directory when no path
    /// is given. Only an explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())?)
    }

    pub fn level(&self) -> LevelFilter {
        engine_logging::level_from_name(&self.log_level)
    }

    /// The configured theme; an unknown name falls back to the default.
    pub fn theme(&self) -> Theme {
        self.theme.parse().unwrap_or_else(|err| {
            engine_warn!("{err}; using {}", Theme::default());
            Theme::default()
        })
    }

    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms.max(1))
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            fetch: FetchSettings {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                max_bytes: self.max_bytes,
                user_agent: self.user_agent.clone(),
                ..FetchSettings::default()
            },
            archive: ArchiveSettings {
                min_content_bytes: self.min_content_bytes,
            },
            output_dir: self.output_dir.clone(),
            start_grace: Duration::from_millis(self.start_grace_ms),
            tab_grace: Duration::from_millis(self.tab_grace_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn omitted_fields_take_defaults() {
        let config = HarvestConfig::parse("(min_content_bytes: 2048, theme: \"dark\")").unwrap();

        assert_eq!(config.min_content_bytes, 2048);
        assert_eq!(config.theme(), Theme::Dark);
        assert_eq!(config.scroll_interval_ms, 3_000);
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn round_trips_through_ron() {
        let config = HarvestConfig {
            log_target: LogTarget::Both,
            auto_scroll: false,
            ..HarvestConfig::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(HarvestConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn explicit_file_must_exist_and_is_read() {
        let temp = TempDir::new().unwrap();
        assert!(HarvestConfig::load(Some(&temp.path().join("absent.ron"))).is_err());

        let path = temp.path().join("harvester.ron");
        fs::write(&path, "(output_dir: \"out\", auto_scroll: false)").unwrap();
        let config = HarvestConfig::load(Some(&path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(!config.auto_scroll);
    }

    #[test]
    fn unknown_theme_falls_back() {
        let config = HarvestConfig {
            theme: "sepia".to_string(),
            ..HarvestConfig::default()
        };
        assert_eq!(config.theme(), Theme::Light);
    }

    #[test]
    fn engine_settings_follow_config() {
        let config = HarvestConfig {
            start_grace_ms: 0,
            min_content_bytes: 10,
            ..HarvestConfig::default()
        };
        let settings = config.engine_settings();
        assert_eq!(settings.start_grace, Duration::ZERO);
        assert_eq!(settings.archive.min_content_bytes, 10);
        assert_eq!(settings.fetch.user_agent, DEFAULT_USER_AGENT);
    }
}
