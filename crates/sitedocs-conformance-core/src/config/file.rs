// crates/sitedocs-conformance-core/src/config/file.rs
// ============================================================================
// Module: Conformance Config Files
// Description: TOML and legacy JSON configuration loading.
// Purpose: Produce a validated ConformanceConfig before any request runs.
// Dependencies: serde, serde_json, thiserror, toml, url
// ============================================================================

//! ## Overview
//! Two on-disk layouts are accepted:
//! - a TOML file with `base_url`, `api_key` (or `api_key_env`),
//!   `fixtures_dir`, and optional `[retry]`, `[consistency]`, `[http]`
//!   sections;
//! - a legacy directory holding `config.json` (`{"baseURL": ...}`) and
//!   `apikey.json` (`{"APIKey": ...}`) next to the fixture files.
//!
//! Environment overrides from [`EnvOverrides`] win over both.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::env::EnvOverrides;
use super::env::read_env_nonempty;
use crate::credential::ApiKey;
use crate::retry::DEFAULT_POLL_INTERVAL;
use crate::retry::DEFAULT_POLL_TIMEOUT;
use crate::retry::DEFAULT_RETRIES;
use crate::retry::DEFAULT_RETRY_DELAY;
use crate::retry::MAX_RETRIES;
use crate::retry::PollPolicy;
use crate::retry::RetryPolicy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixture directory used when none is configured.
pub const DEFAULT_FIXTURES_DIR: &str = "Configuration";
/// Per-request timeout used when none is configured.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum accepted size of a config file.
const MAX_CONFIG_BYTES: u64 = 256 * 1024;
/// Legacy base URL document name.
const LEGACY_CONFIG_FILE: &str = "config.json";
/// Legacy API key document name.
const LEGACY_APIKEY_FILE: &str = "apikey.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable could not be used.
    #[error("{name} {reason}")]
    Env {
        /// Variable name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// Config file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Config file exceeds the size limit.
    #[error("{path} exceeds {limit} bytes")]
    TooLarge {
        /// Path being read.
        path: PathBuf,
        /// Size limit in bytes.
        limit: u64,
    },
    /// TOML config could not be parsed.
    #[error("invalid config {path}: {message}")]
    Toml {
        /// Path being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Legacy JSON config could not be parsed.
    #[error("invalid legacy config {path}: {source}")]
    Json {
        /// Path being parsed.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },
    /// No config file, directory, or environment values were supplied.
    #[error("no configuration source: pass --config or set SITEDOCS_CONFIG")]
    MissingSource,
    /// Base URL is absent after overrides.
    #[error("base_url is required")]
    MissingBaseUrl,
    /// API key is absent or empty after overrides.
    #[error("api_key is required and must not be empty")]
    MissingApiKey,
    /// Base URL failed validation.
    #[error("invalid base_url '{value}': {reason}")]
    InvalidBaseUrl {
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A numeric or policy field failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

// ============================================================================
// SECTION: File Schema
// ============================================================================

/// Raw TOML config document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Base URL of the API under test.
    base_url: Option<String>,
    /// Inline API key.
    api_key: Option<String>,
    /// Name of an environment variable holding the API key.
    api_key_env: Option<String>,
    /// Fixture directory, relative to the config file.
    fixtures_dir: Option<PathBuf>,
    /// Whole-case retry settings.
    #[serde(default)]
    retry: RetrySection,
    /// Eventual-consistency polling settings.
    #[serde(default)]
    consistency: ConsistencySection,
    /// HTTP client settings.
    #[serde(default)]
    http: HttpSection,
}

/// `[retry]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RetrySection {
    /// Retries after the first attempt.
    retries: u32,
    /// Delay between attempts in milliseconds.
    delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay_ms: duration_millis(DEFAULT_RETRY_DELAY),
        }
    }
}

/// `[consistency]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct ConsistencySection {
    /// Poll deadline in milliseconds.
    poll_timeout_ms: u64,
    /// Poll interval in milliseconds.
    poll_interval_ms: u64,
}

impl Default for ConsistencySection {
    fn default() -> Self {
        Self {
            poll_timeout_ms: duration_millis(DEFAULT_POLL_TIMEOUT),
            poll_interval_ms: duration_millis(DEFAULT_POLL_INTERVAL),
        }
    }
}

/// `[http]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct HttpSection {
    /// Per-request timeout in milliseconds.
    timeout_ms: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_ms: duration_millis(DEFAULT_HTTP_TIMEOUT),
        }
    }
}

/// Legacy `config.json` document.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    /// Base URL of the API under test.
    #[serde(rename = "baseURL")]
    base_url: String,
}

/// Legacy `apikey.json` document.
#[derive(Debug, Deserialize)]
struct LegacyApiKey {
    /// API key value.
    #[serde(rename = "APIKey")]
    api_key: String,
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Where a configuration was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// TOML file.
    File(PathBuf),
    /// Legacy `Configuration/` directory.
    LegacyDir(PathBuf),
    /// Environment variables only.
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::LegacyDir(path) => write!(f, "legacy directory {}", path.display()),
            Self::Environment => f.write_str("environment"),
        }
    }
}

/// Validated configuration for a conformance run.
#[derive(Debug, Clone)]
pub struct ConformanceConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: Url,
    /// Configured API key.
    pub api_key: ApiKey,
    /// Directory holding fixture JSON documents.
    pub fixtures_dir: PathBuf,
    /// Whole-case retry policy.
    pub retry: RetryPolicy,
    /// Read-after-write polling policy.
    pub poll: PollPolicy,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Where the configuration came from.
    pub source: ConfigSource,
}

impl ConformanceConfig {
    /// Loads configuration from `path` or `SITEDOCS_CONFIG`, then applies
    /// environment overrides.
    ///
    /// A directory path is treated as the legacy layout; anything else is
    /// parsed as TOML. With no path at all, base URL and key must come from
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the source is unreadable or invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = EnvOverrides::load()?;
        let path = path.map(Path::to_path_buf).or_else(|| env.config_path.clone());
        match path {
            Some(path) if path.is_dir() => Self::from_legacy_dir(&path, &env),
            Some(path) => {
                let text = read_bounded(&path)?;
                let base_dir = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
                Self::from_toml_str(&text, &base_dir, &env, ConfigSource::File(path))
            }
            None => Self::from_env(&env),
        }
    }

    /// Parses a TOML document with fixture paths resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(
        text: &str,
        base_dir: &Path,
        env: &EnvOverrides,
        source: ConfigSource,
    ) -> Result<Self, ConfigError> {
        let path = match &source {
            ConfigSource::File(path) | ConfigSource::LegacyDir(path) => path.clone(),
            ConfigSource::Environment => PathBuf::from("<inline>"),
        };
        let file: ConfigFile = toml::from_str(text).map_err(|err| ConfigError::Toml {
            path,
            message: err.to_string(),
        })?;
        let api_key = match (&file.api_key, &file.api_key_env) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid {
                    field: "api_key",
                    reason: "set either api_key or api_key_env, not both".to_string(),
                });
            }
            (Some(key), None) => Some(key.clone()),
            (None, Some(var)) => read_env_nonempty(var)?,
            (None, None) => None,
        };
        let fixtures_dir = file
            .fixtures_dir
            .as_deref()
            .map_or_else(|| base_dir.join(DEFAULT_FIXTURES_DIR), |dir| base_dir.join(dir));
        let draft = Draft {
            base_url: file.base_url,
            api_key,
            fixtures_dir,
            retry: RetryPolicy {
                retries: file.retry.retries,
                delay: Duration::from_millis(file.retry.delay_ms),
            },
            poll: PollPolicy {
                timeout: Duration::from_millis(file.consistency.poll_timeout_ms),
                interval: Duration::from_millis(file.consistency.poll_interval_ms),
            },
            http_timeout: Duration::from_millis(file.http.timeout_ms),
        };
        draft.finish(env, source)
    }

    /// Loads the legacy directory layout (`config.json` + `apikey.json`).
    ///
    /// Fixtures are expected in the same directory. Timing policies use the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when either document is missing or invalid.
    pub fn from_legacy_dir(dir: &Path, env: &EnvOverrides) -> Result<Self, ConfigError> {
        let config: LegacyConfig = read_legacy_json(&dir.join(LEGACY_CONFIG_FILE))?;
        // The key file may be omitted when the key comes from the environment.
        let key_path = dir.join(LEGACY_APIKEY_FILE);
        let api_key = if env.api_key.is_none() || key_path.exists() {
            let key: LegacyApiKey = read_legacy_json(&key_path)?;
            Some(key.api_key)
        } else {
            None
        };
        let draft = Draft {
            base_url: Some(config.base_url),
            api_key,
            fixtures_dir: dir.to_path_buf(),
            ..Draft::defaults()
        };
        draft.finish(env, ConfigSource::LegacyDir(dir.to_path_buf()))
    }

    /// Builds configuration from environment values alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSource`] when neither base URL nor key is
    /// set, or a validation error otherwise.
    pub fn from_env(env: &EnvOverrides) -> Result<Self, ConfigError> {
        if env.base_url.is_none() && env.api_key.is_none() {
            return Err(ConfigError::MissingSource);
        }
        Draft {
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
            ..Draft::defaults()
        }
        .finish(env, ConfigSource::Environment)
    }

    /// Returns a copy with a different fixtures directory.
    #[must_use]
    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Returns a copy with different retry and poll policies.
    #[must_use]
    pub const fn with_policies(mut self, retry: RetryPolicy, poll: PollPolicy) -> Self {
        self.retry = retry;
        self.poll = poll;
        self
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Unvalidated configuration values prior to overrides.
struct Draft {
    /// Base URL text.
    base_url: Option<String>,
    /// API key text.
    api_key: Option<String>,
    /// Fixture directory.
    fixtures_dir: PathBuf,
    /// Retry policy.
    retry: RetryPolicy,
    /// Poll policy.
    poll: PollPolicy,
    /// HTTP timeout.
    http_timeout: Duration,
}

impl Draft {
    /// Draft with default policies and no credentials.
    fn defaults() -> Self {
        Self {
            base_url: None,
            api_key: None,
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Applies environment overrides and validates every field.
    fn finish(self, env: &EnvOverrides, source: ConfigSource) -> Result<ConformanceConfig, ConfigError> {
        let base_url = env.base_url.clone().or(self.base_url).ok_or(ConfigError::MissingBaseUrl)?;
        let base_url = parse_base_url(&base_url)?;
        let api_key = env
            .api_key
            .clone()
            .or(self.api_key)
            .and_then(ApiKey::new)
            .ok_or(ConfigError::MissingApiKey)?;
        validate_policies(self.retry, self.poll, self.http_timeout)?;
        Ok(ConformanceConfig {
            base_url,
            api_key,
            fixtures_dir: self.fixtures_dir,
            retry: self.retry,
            poll: self.poll,
            http_timeout: self.http_timeout,
            source,
        })
    }
}

/// Parses and checks an absolute `http`/`https` base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("must be an absolute URL with a host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment"));
    }
    Ok(url)
}

/// Checks retry, poll, and timeout bounds.
fn validate_policies(
    retry: RetryPolicy,
    poll: PollPolicy,
    http_timeout: Duration,
) -> Result<(), ConfigError> {
    if retry.retries > MAX_RETRIES {
        return Err(ConfigError::Invalid {
            field: "retry.retries",
            reason: format!("must be at most {MAX_RETRIES}"),
        });
    }
    if poll.interval.is_zero() {
        return Err(ConfigError::Invalid {
            field: "consistency.poll_interval_ms",
            reason: "must be greater than zero".to_string(),
        });
    }
    if poll.interval > poll.timeout {
        return Err(ConfigError::Invalid {
            field: "consistency.poll_interval_ms",
            reason: "must not exceed consistency.poll_timeout_ms".to_string(),
        });
    }
    if http_timeout.is_zero() {
        return Err(ConfigError::Invalid {
            field: "http.timeout_ms",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a config file, enforcing the size limit.
fn read_bounded(path: &Path) -> Result<String, ConfigError> {
    let read_err = |source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(read_err)?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            limit: MAX_CONFIG_BYTES,
        });
    }
    fs::read_to_string(path).map_err(read_err)
}

/// Reads and decodes one legacy JSON document.
fn read_legacy_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = read_bounded(path)?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Converts a duration to whole milliseconds for serde defaults.
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
