// crates/sitedocs-conformance-core/src/logging.rs
// ============================================================================
// Module: Logging
// Description: Process-level tracing subscriber setup.
// Purpose: Route harness diagnostics to stderr at a level chosen by env.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! [`init`] installs a `tracing-subscriber` fmt subscriber writing to stderr.
//! The level comes from `SITEDOCS_LOG` (`trace`, `debug`, `info`, `warn`,
//! `error`; default `info`). Only the first call installs a subscriber.

use std::sync::OnceLock;

use tracing::Level;
use tracing::debug;

use crate::config::ConformanceEnv;
use crate::config::read_env_strict;

/// Set by the first initialization attempt.
static INIT: OnceLock<()> = OnceLock::new();

/// Parses a level name; unknown names fall back to `info`.
#[must_use]
pub fn parse_level(raw: Option<&str>) -> Level {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs the stderr subscriber using the level from `SITEDOCS_LOG`.
///
/// Safe to call more than once. A subscriber installed elsewhere is left in
/// place. Returns true when this call installed the subscriber.
pub fn init() -> bool {
    let raw = read_env_strict(ConformanceEnv::Log.as_str()).ok().flatten();
    init_with_level(parse_level(raw.as_deref()))
}

/// Installs the stderr subscriber at an explicit level.
///
/// Returns false when an earlier call already ran or another global
/// subscriber owns the process; the existing subscriber keeps its level.
pub fn init_with_level(level: Level) -> bool {
    if INIT.set(()).is_err() {
        return false;
    }
    match tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "keeping existing tracing subscriber");
            false
        }
    }
}
