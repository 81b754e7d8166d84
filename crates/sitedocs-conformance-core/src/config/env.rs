// crates/sitedocs-conformance-core/src/config/env.rs
// ============================================================================
// Module: Conformance Environment
// Description: Environment-backed overrides for conformance configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 and empty values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use super::file::ConfigError;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys recognized by the conformance checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConformanceEnv {
    /// Path to a TOML config file or a legacy `Configuration/` directory.
    Config,
    /// Overrides the configured base URL.
    BaseUrl,
    /// Overrides the configured API key.
    ApiKey,
    /// Log level filter (`trace`, `debug`, `info`, `warn`, `error`).
    Log,
}

impl ConformanceEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "SITEDOCS_CONFIG",
            Self::BaseUrl => "SITEDOCS_BASE_URL",
            Self::ApiKey => "SITEDOCS_API_KEY",
            Self::Log => "SITEDOCS_LOG",
        }
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Values read from the environment that take precedence over file config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Config source path (`SITEDOCS_CONFIG`).
    pub config_path: Option<PathBuf>,
    /// Base URL override (`SITEDOCS_BASE_URL`).
    pub base_url: Option<String>,
    /// API key override (`SITEDOCS_API_KEY`).
    pub api_key: Option<String>,
}

impl EnvOverrides {
    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set but empty or not valid UTF-8.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            config_path: read_env_nonempty(ConformanceEnv::Config.as_str())?.map(PathBuf::from),
            base_url: read_env_nonempty(ConformanceEnv::BaseUrl.as_str())?,
            api_key: read_env_nonempty(ConformanceEnv::ApiKey.as_str())?,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::Env {
            name: name.to_string(),
            reason: "must be valid UTF-8".to_string(),
        })
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(ConfigError::Env {
            name: name.to_string(),
            reason: "must not be empty".to_string(),
        }),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}
