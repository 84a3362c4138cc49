//! Logging macros that set target to "pg_warden" for all log calls.
//!
//! Without an explicit target, tracing uses the full module path
//! (e.g., "pg_warden::server::session"), which makes filter directives and
//! downstream log routing needlessly verbose. These macros ensure all logs
//! from this crate use a single "pg_warden" target.

macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!(target: "pg_warden", $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!(target: "pg_warden", $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { ::tracing::info!(target: "pg_warden", $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!(target: "pg_warden", $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!(target: "pg_warden", $($arg)*) };
}
