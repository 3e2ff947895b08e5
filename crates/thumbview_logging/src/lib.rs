#![deny(missing_docs)]
//! Shared logging utilities for the thumbview workspace.
//!
//! This crate provides the `thumb_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is stamped
//! with the scheduler epoch the emitting thread is working for, so output from
//! stale work is easy to tell apart from current work.

use std::cell::Cell;

thread_local! {
    /// Epoch the current thread is working for; `None` outside scheduler work.
    static LOG_EPOCH: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Sets the epoch tag for the current thread.
/// Workers call this before running a unit; the consumer after stop/refresh.
pub fn set_log_epoch(epoch: u64) {
    LOG_EPOCH.with(|v| v.set(Some(epoch)));
}

/// Clears the epoch tag for the current thread.
pub fn clear_log_epoch() {
    LOG_EPOCH.with(|v| v.set(None));
}

/// Retrieves the epoch tag for the current thread, if one is set.
pub fn get_log_epoch() -> Option<u64> {
    LOG_EPOCH.with(|v| v.get())
}

/// Formats the epoch tag prefix, e.g. `[e3] ` or `[e-] `.
#[doc(hidden)]
pub fn epoch_tag() -> String {
    match get_log_epoch() {
        Some(epoch) => format!("[e{epoch}] "),
        None => "[e-] ".to_string(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! thumb_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::epoch_tag(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! thumb_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::epoch_tag(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! thumb_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::epoch_tag(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! thumb_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::epoch_tag(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! thumb_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::epoch_tag(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Trace in debug builds so stale-discard paths show up; info in release.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
