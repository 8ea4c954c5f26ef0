#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the logger initialisation used by the binary, and a minimal test
//! initializer for the global logger.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to the log file only.
    File,
    /// Write to the terminal (stderr for warnings, stdout otherwise).
    #[default]
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Parses a level name such as `"debug"` or `"WARN"`.
///
/// Unknown names fall back to `Info`.
pub fn level_from_name(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Initialize the global logger with the specified destination.
///
/// File output is created (truncated) at `log_path`. When the file cannot be
/// created the terminal logger is still installed if requested; a file-only
/// destination then logs nothing. Calling this twice is harmless.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_path: &Path) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(level, config, log_path) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_path: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::level_from_name;
    use log::LevelFilter;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(level_from_name("debug"), LevelFilter::Debug);
        assert_eq!(level_from_name(" WARN "), LevelFilter::Warn);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(level_from_name("chatty"), LevelFilter::Info);
    }
}
