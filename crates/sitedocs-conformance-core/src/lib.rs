// crates/sitedocs-conformance-core/src/lib.rs
// ============================================================================
// Module: SiteDocs Conformance Core
// Description: Harness for verifying the SiteDocs HTTP API against fixtures.
// Purpose: Provide config, client, assertions, retries, and the case catalog.
// Dependencies: reqwest, serde, serde_json, thiserror, tokio, toml, tracing
// ============================================================================

//! ## Overview
//! This crate drives conformance checks against a remote SiteDocs API. A
//! check is a sequence of HTTP requests issued through [`client::ApiClient`],
//! assertions over the captured responses, and bounded waits for eventual
//! consistency.
//!
//! The catalog in [`suite`] groups checks by resource (forms, locations,
//! workers). Mutating checks run as explicit [`scenario::MutationScenario`]
//! steps that always attempt to restore the baseline fixture state.
//!
//! The suite mutates shared remote state; it is not safe to run two suites
//! against the same environment concurrently.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertions;
pub mod client;
pub mod config;
pub mod credential;
pub mod endpoints;
pub mod fixtures;
pub mod logging;
pub mod report;
pub mod retry;
pub mod scenario;
pub mod suite;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use client::ApiClient;
pub use client::ApiRequest;
pub use client::ApiResponse;
pub use config::ConformanceConfig;
pub use credential::ApiKey;
pub use credential::Credential;
pub use endpoints::Endpoint;
pub use fixtures::FixtureSet;
pub use retry::PollPolicy;
pub use retry::RetryPolicy;
pub use suite::Group;
pub use suite::SuiteContext;
pub use suite::runner::SuiteReport;
pub use suite::runner::SuiteRunner;
