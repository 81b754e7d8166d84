// crates/sitedocs-conformance-core/src/credential.rs
// ============================================================================
// Module: Credentials
// Description: API key newtype and per-request credential selection.
// Purpose: Keep the configured key out of logs and support sentinel probes.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The SiteDocs API authenticates with a raw `Authorization: <key>` header.
//! [`ApiKey`] wraps the configured key and redacts it from `Debug` output.
//! [`Credential`] selects which value a single request sends, including the
//! deliberately invalid sentinel used to provoke `401 Unauthorized`.

use std::fmt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Deliberately invalid API key used by unauthorized-access checks.
pub const INVALID_API_KEY: &str = "thisIsAnInvalidAPIKey";

// ============================================================================
// SECTION: API Key
// ============================================================================

/// Configured API key. The value is never rendered by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, rejecting empty or whitespace-only values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(value))
    }

    /// Returns the raw key for use in the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

// ============================================================================
// SECTION: Credential Selection
// ============================================================================

/// Authorization value sent with a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credential {
    /// The key from configuration.
    #[default]
    Configured,
    /// The invalid sentinel key ([`INVALID_API_KEY`]).
    Sentinel,
    /// No `Authorization` header at all.
    Anonymous,
}

impl Credential {
    /// Resolves the header value for this credential.
    #[must_use]
    pub fn header_value<'a>(&self, configured: &'a ApiKey) -> Option<&'a str> {
        match self {
            Self::Configured => Some(configured.expose()),
            Self::Sentinel => Some(INVALID_API_KEY),
            Self::Anonymous => None,
        }
    }

    /// Short label used in transcripts and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Sentinel => "sentinel",
            Self::Anonymous => "anonymous",
        }
    }
}
