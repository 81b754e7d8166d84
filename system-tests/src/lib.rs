// system-tests/src/lib.rs
// ============================================================================
// Module: SiteDocs Conformance System Tests Library
// Description: Shared configuration for system test scenarios.
// Purpose: Provide common settings for the stub-backed and live test binaries.
// Dependencies: sitedocs-conformance-core
// ============================================================================

//! ## Overview
//! This crate hosts the environment-backed configuration shared by the
//! system-test binaries in `system-tests/tests`. The binaries themselves
//! exercise the full conformance catalog against an in-process stub of the
//! SiteDocs API or, behind the `live-api` feature, a real environment.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
