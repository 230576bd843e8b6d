//! Logging macros used across the workspace.
//!
//! Thin wrappers over `tracing`, so call sites do not depend on the
//! logging backend directly.

/// Trace level event.
#[macro_export]
macro_rules! ldn_log_trace {
    ($($arg:tt)+) => { tracing::trace!($($arg)+) };
}

/// Debug level event.
#[macro_export]
macro_rules! ldn_log_debug {
    ($($arg:tt)+) => { tracing::debug!($($arg)+) };
}

/// Info level event.
#[macro_export]
macro_rules! ldn_log_info {
    ($($arg:tt)+) => { tracing::info!($($arg)+) };
}

/// Warn level event.
#[macro_export]
macro_rules! ldn_log_warn {
    ($($arg:tt)+) => { tracing::warn!($($arg)+) };
}

/// Error level event.
#[macro_export]
macro_rules! ldn_log_error {
    ($($arg:tt)+) => { tracing::error!($($arg)+) };
}
