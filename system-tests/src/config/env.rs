// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: sitedocs-conformance-core
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 fails closed. Live runs only mutate remote
//! state when [`SystemTestEnv::AllowMutation`] is set explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use sitedocs_conformance_core::config;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional run root override.
    RunRoot,
    /// Conformance config (TOML file or legacy directory) for live runs.
    Config,
    /// Optional per-request timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Allow live runs to mutate remote state (`true`/`false` or `1`/`0`).
    AllowMutation,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "SITEDOCS_SYSTEM_TEST_RUN_ROOT",
            Self::Config => "SITEDOCS_SYSTEM_TEST_CONFIG",
            Self::TimeoutSeconds => "SITEDOCS_SYSTEM_TEST_TIMEOUT_SEC",
            Self::AllowMutation => "SITEDOCS_SYSTEM_TEST_ALLOW_MUTATION",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Conformance config location for live runs.
    pub config: Option<PathBuf>,
    /// Optional per-request timeout override.
    pub timeout: Option<Duration>,
    /// Whether live runs may mutate remote state.
    pub allow_mutation: bool,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let run_root = read_env_nonempty(SystemTestEnv::RunRoot.as_str())?.map(PathBuf::from);
        let config = read_env_nonempty(SystemTestEnv::Config.as_str())?.map(PathBuf::from);
        let timeout = read_env_nonempty(SystemTestEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(SystemTestEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let allow_mutation = parse_bool_env(
            SystemTestEnv::AllowMutation.as_str(),
            read_env_nonempty(SystemTestEnv::AllowMutation.as_str())?,
        )?;
        Ok(Self {
            run_root,
            config,
            timeout,
            allow_mutation,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable, rejecting empty values and invalid UTF-8.
///
/// # Errors
///
/// Returns the rendered config error for the variable.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    config::read_env_nonempty(name).map_err(|err| err.to_string())
}

/// Parses a positive timeout value from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean environment variable; unset means `false`.
///
/// # Errors
///
/// Returns an error when the value is not a recognized boolean literal.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
