//! Logging setup for Conduit.
//!
//! Conduit emits `tracing` events for connection lifecycle and statement
//! execution. Nothing is printed unless a subscriber is installed, either by
//! the application or through [`init`] (requires the `tracing-subscriber`
//! feature).
//!
//! # Environment Variables
//!
//! - `CONDUIT_DEBUG=true|1|yes` - Enable debug logging
//! - `CONDUIT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `CONDUIT_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use conduit_core::logging;
//!
//! logging::init();
//! ```
//!
//! The per-connection query log ([`crate::QueryLogEntry`]) is separate from
//! these events and is controlled on each [`crate::Connection`].

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "CONDUIT_DEBUG";
const LEVEL_VAR: &str = "CONDUIT_LOG_LEVEL";
const FORMAT_VAR: &str = "CONDUIT_LOG_FORMAT";

/// Check if debug logging is enabled via `CONDUIT_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

/// The log level from `CONDUIT_LOG_LEVEL`, falling back to `debug` when
/// `CONDUIT_DEBUG` is set and `warn` otherwise.
pub fn get_log_level() -> &'static str {
    resolve_level(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

/// The output format from `CONDUIT_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    resolve_format(env::var(FORMAT_VAR).ok().as_deref())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn resolve_level(raw: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match raw.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

fn resolve_format(raw: Option<&str>) -> &'static str {
    match raw.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Install a global subscriber for Conduit's events.
///
/// Does nothing unless `CONDUIT_DEBUG` or `CONDUIT_LOG_LEVEL` is set.
/// Subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "conduit={},conduit_core={},conduit_sqlite={},conduit_mysql={}",
                level, level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Conduit logging initialized"
                );
            }
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables. Call it at startup before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: only called at program startup before threads are spawned.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

/// Equivalent to setting `CONDUIT_DEBUG=true` and calling [`init`].
///
/// # Safety
///
/// This function modifies environment variables. Call it at startup before
/// spawning threads.
pub fn init_debug() {
    // SAFETY: only called at program startup before threads are spawned.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    init();
}

/// Debug event emitted only when `CONDUIT_DEBUG` is enabled.
#[macro_export]
macro_rules! conduit_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace event emitted only when `CONDUIT_DEBUG` is enabled.
#[macro_export]
macro_rules! conduit_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
