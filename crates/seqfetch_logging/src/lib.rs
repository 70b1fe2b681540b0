#![deny(missing_docs)]
//! Shared logging utilities for the seqfetch workspace.
//!
//! This crate provides the `seqfetch_*` logging macros used across the codebase,
//! logger initialization for binaries and a minimal test initializer for the
//! global logger.
//!
//! Every macro also takes a leading `slot: label,` which logs under the
//! target `seqfetch::slot::<label>`, so output of one request slot can be
//! told apart (and filtered) from the others:
//!
//! ```
//! let label = "orders";
//! seqfetch_logging::seqfetch_debug!(slot: label, "issued generation {}", 3);
//! ```

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log as __log;

/// File written by [`LogDestination::File`] and [`LogDestination::Both`].
pub const LOG_FILE: &str = "./seqfetch.log";

/// Environment variable read by [`level_from_env`].
pub const LEVEL_ENV: &str = "SEQFETCH_LOG";

/// Prefix of the per-slot log targets.
pub const SLOT_TARGET_PREFIX: &str = "seqfetch::slot::";

/// Log target used by the `slot:` form of the macros.
pub fn slot_target(label: &str) -> String {
    format!("{SLOT_TARGET_PREFIX}{label}")
}

/// Level named by `SEQFETCH_LOG` (`off`, `error` .. `trace`), or `default`
/// when the variable is unset or unreadable.
pub fn level_from_env(default: LevelFilter) -> LevelFilter {
    std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(default)
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse().ok()
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! seqfetch_trace {
    (slot: $slot:expr, $($arg:tt)+) => {{
        $crate::__log::trace!(target: $crate::slot_target(&$slot).as_str(), $($arg)+);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! seqfetch_debug {
    (slot: $slot:expr, $($arg:tt)+) => {{
        $crate::__log::debug!(target: $crate::slot_target(&$slot).as_str(), $($arg)+);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! seqfetch_info {
    (slot: $slot:expr, $($arg:tt)+) => {{
        $crate::__log::info!(target: $crate::slot_target(&$slot).as_str(), $($arg)+);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! seqfetch_warn {
    (slot: $slot:expr, $($arg:tt)+) => {{
        $crate::__log::warn!(target: $crate::slot_target(&$slot).as_str(), $($arg)+);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! seqfetch_error {
    (slot: $slot:expr, $($arg:tt)+) => {{
        $crate::__log::error!(target: $crate::slot_target(&$slot).as_str(), $($arg)+);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to ./seqfetch.log in current directory.
    File,
    /// Write to terminal (stdout).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initialize the logger with the specified destination and level.
///
/// For `LogDestination::File` or `Both`, creates `./seqfetch.log` in the
/// current working directory. A second call is a no-op.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => {
            vec![TermLogger::new(
                level,
                config,
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )]
        }
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
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

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
