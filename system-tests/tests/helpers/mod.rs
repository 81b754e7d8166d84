// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for SiteDocs conformance system-tests.
// Purpose: Provide the API stub, fixtures, harness wiring, and artifacts.
// Dependencies: system-tests, sitedocs-conformance-core
// ============================================================================

//! ## Overview
//! Shared helpers for the conformance system-tests. Stub-backed tests never
//! touch the network beyond loopback; live tests reuse the artifact and
//! readiness helpers only.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod api_stub;
pub mod fixtures;
pub mod harness;
