//! Structured console logging for jarwatch
//!
//! Provides tagged, colorized log output with per-module debug gating:
//! - Standard levels (Error/Warning/Info/Debug)
//! - Debug output only shown when the matching --debug-<module> flag is set
//! - Tag + type prefix alignment for scannable output
//!
//! Call sites use `log(LogTag::Api, "FETCH", "...")` for typed events or the
//! level helpers (`logger::info`, `logger::warning`, ...) for plain messages.

use crate::arguments::{
    is_debug_api_enabled, is_debug_cache_enabled, is_debug_jar_enabled,
    is_debug_webserver_enabled,
};
use chrono::Local;
use colored::*;

/// Log format widths for alignment
const TAG_WIDTH: usize = 9;
const TYPE_WIDTH: usize = 12;

// =============================================================================
// TAGS AND LEVELS
// =============================================================================

/// Source module of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Api,
    Jar,
    Cache,
    Webserver,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Api => "API",
            LogTag::Jar => "JAR",
            LogTag::Cache => "CACHE",
            LogTag::Webserver => "WEB",
        }
    }

    /// Whether debug output is enabled for this tag
    fn debug_enabled(&self) -> bool {
        match self {
            LogTag::System => true,
            LogTag::Api => is_debug_api_enabled(),
            LogTag::Jar => is_debug_jar_enabled(),
            LogTag::Cache => is_debug_cache_enabled(),
            LogTag::Webserver => is_debug_webserver_enabled(),
        }
    }
}

/// Log level ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Initialize the logger
///
/// Kept as an explicit startup step so main.rs reads the same as any other
/// service wiring; currently only forces CMD_ARGS to be captured.
pub fn init() {
    crate::arguments::get_cmd_args();
}

/// Log a typed event at INFO level (DEBUG when the type marks diagnostics)
pub fn log(tag: LogTag, log_type: &str, message: &str) {
    let level = match log_type {
        "ERROR" => LogLevel::Error,
        "WARN" => LogLevel::Warning,
        "DEBUG" => LogLevel::Debug,
        _ => LogLevel::Info,
    };
    log_internal(tag, level, log_type, message);
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, "ERROR", message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, "WARN", message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, "INFO", message);
}

/// Log at DEBUG level (only shown with the matching --debug-<module> flag)
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, "DEBUG", message);
}

// =============================================================================
// INTERNALS
// =============================================================================

fn should_log(tag: LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }
    if level == LogLevel::Debug {
        return tag.debug_enabled();
    }
    true
}

fn log_internal(tag: LogTag, level: LogLevel, log_type: &str, message: &str) {
    if !should_log(tag, level) {
        return;
    }

    let time = Local::now().format("%H:%M:%S").to_string();
    let tag_str = format!("{:<width$}", tag.as_str(), width = TAG_WIDTH);
    let type_str = format!("{:<width$}", log_type, width = TYPE_WIDTH);

    let tag_colored = match tag {
        LogTag::System => tag_str.cyan().bold(),
        LogTag::Api => tag_str.blue().bold(),
        LogTag::Jar => tag_str.green().bold(),
        LogTag::Cache => tag_str.magenta().bold(),
        LogTag::Webserver => tag_str.yellow().bold(),
    };

    let type_colored = match level {
        LogLevel::Error => type_str.red().bold(),
        LogLevel::Warning => type_str.yellow(),
        LogLevel::Info => type_str.normal(),
        LogLevel::Debug => type_str.dimmed(),
    };

    println!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        tag_colored,
        type_colored,
        message
    );
}
