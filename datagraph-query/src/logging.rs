//! Logging setup for the data graph.
//!
//! The graph logs through `tracing`; this module only installs a subscriber
//! when asked to through the environment.
//!
//! # Environment Variables
//!
//! - `DATAGRAPH_DEBUG=true|1|yes` - Enable debug logging
//! - `DATAGRAPH_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific log level
//! - `DATAGRAPH_LOG_FORMAT=json|pretty|compact` - Set the output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use datagraph_query::logging;
//!
//! // Call once at startup; a no-op unless the environment asks for logs.
//! logging::init();
//! ```
//!
//! What gets logged:
//!
//! - `debug`: one event per batched relation fetch (relation, entity, parent
//!   count, distinct keys, rows returned) and per node fetch
//! - `trace`: linking detail (skipped fetches, unmatched children)
//! - `warn`: ignored configuration, several children matching a singular relation

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "DATAGRAPH_DEBUG";
const LEVEL_VAR: &str = "DATAGRAPH_LOG_LEVEL";
const FORMAT_VAR: &str = "DATAGRAPH_LOG_FORMAT";

/// Check whether `DATAGRAPH_DEBUG` is set to "true", "1" or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The log level from `DATAGRAPH_LOG_LEVEL`.
///
/// Unset or unrecognized levels fall back to "debug" when `DATAGRAPH_DEBUG`
/// is enabled, "warn" otherwise.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var(LEVEL_VAR) {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The output format from `DATAGRAPH_LOG_FORMAT`; defaults to "json".
pub fn get_log_format() -> &'static str {
    env::var(FORMAT_VAR)
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// The `EnvFilter` directive for the configured level.
pub fn filter_directive() -> String {
    let level = get_log_level();
    format!("datagraph={},datagraph_query={}", level, level)
}

/// Install the logging subscriber.
///
/// Subsequent calls are no-ops. Nothing is installed unless `DATAGRAPH_DEBUG`
/// or `DATAGRAPH_LOG_LEVEL` is set, or without the `tracing-subscriber`
/// feature; applications can always install their own subscriber instead.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter =
                EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new("warn"));

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
                    level = get_log_level(),
                    format = get_log_format(),
                    "datagraph logging initialized"
                );
            }
        }
    });
}

/// Initialize logging at a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call it early, before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: only meant to be called at program startup, before threads are spawned.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

/// Initialize debug logging; equivalent to `DATAGRAPH_DEBUG=true` plus [`init`].
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call it early, before spawning threads.
pub fn init_debug() {
    // SAFETY: only meant to be called at program startup, before threads are spawned.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    init();
}
