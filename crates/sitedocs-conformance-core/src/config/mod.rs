// crates/sitedocs-conformance-core/src/config/mod.rs
// ============================================================================
// Module: Conformance Configuration
// Description: Typed configuration for conformance runs.
// Purpose: Load base URL, API key, fixtures, and timing policies.
// Dependencies: serde, serde_json, toml, url
// ============================================================================

//! ## Overview
//! Configuration comes from a TOML file or from a legacy `Configuration/`
//! directory (`config.json` + `apikey.json`), with environment overrides
//! applied last. Loading fails closed: invalid UTF-8, empty values, unknown
//! keys, and out-of-range timings are all rejected before any request is
//! issued.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;
mod file;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::ConformanceEnv;
pub use env::EnvOverrides;
pub use env::read_env_nonempty;
pub use env::read_env_strict;
pub use file::ConfigError;
pub use file::ConfigSource;
pub use file::ConformanceConfig;
pub use file::DEFAULT_FIXTURES_DIR;
pub use file::DEFAULT_HTTP_TIMEOUT;
