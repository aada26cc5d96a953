#![deny(missing_docs)]
//! Logging for the archiver workspace.
//!
//! Library code logs through the `engine_*` macros, which forward to the
//! `log` facade. Binaries pick where records go with [`initialize`]; tests
//! call [`initialize_for_tests`].

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Forwards to [`log::log!`] at the given level. The `engine_*` macros are
/// thin wrappers around this one.
#[macro_export]
macro_rules! engine_log {
    ($level:expr, $($arg:tt)+) => {
        log::log!($level, $($arg)+)
    };
}

/// Trace-level record, for per-request detail.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)+) => { $crate::engine_log!(log::Level::Trace, $($arg)+) };
}

/// Debug-level record.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)+) => { $crate::engine_log!(log::Level::Debug, $($arg)+) };
}

/// Info-level record.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)+) => { $crate::engine_log!(log::Level::Info, $($arg)+) };
}

/// Warn-level record, for failures that were recovered from.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)+) => { $crate::engine_log!(log::Level::Warn, $($arg)+) };
}

/// Error-level record.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)+) => { $crate::engine_log!(log::Level::Error, $($arg)+) };
}

/// Where [`initialize`] sends log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Truncate and write the given file.
    File(PathBuf),
    /// Standard output and standard error.
    Terminal,
    /// The terminal and the given file.
    Both(PathBuf),
}

impl LogDestination {
    fn file(&self) -> Option<&Path> {
        match self {
            LogDestination::File(path) | LogDestination::Both(path) => Some(path.as_path()),
            LogDestination::Terminal => None,
        }
    }

    fn terminal(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// Install the global logger. Only the first call in a process has an
/// effect. A log file that cannot be created is reported on stderr and left
/// out.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::with_capacity(2);
    if destination.terminal() {
        loggers.push(terminal_logger(level, config.clone()));
    }
    if let Some(path) = destination.file() {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(err) => eprintln!("Warning: could not create log file {}: {}", path.display(), err),
        }
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

/// Terminal logger for tests: debug level in debug builds, info otherwise.
/// Later calls, from other tests in the same binary, do nothing.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger: Box<dyn SharedLogger> = terminal_logger(level, Config::default());
    let _ = CombinedLogger::init(vec![logger]);
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<TermLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}
