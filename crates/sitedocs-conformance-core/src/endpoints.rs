// crates/sitedocs-conformance-core/src/endpoints.rs
// ============================================================================
// Module: Endpoint Catalog
// Description: Typed paths for every SiteDocs endpoint under test.
// Purpose: Keep path construction and per-endpoint verbs in one place.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! Each [`Endpoint`] variant maps to a path relative to the configured base
//! URL. Identifiers are carried as path segments and percent-encoded by the
//! client, so an identifier can never introduce extra path components.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;

// ============================================================================
// SECTION: Endpoint
// ============================================================================

/// SiteDocs endpoint addressed relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `/forms/{id}`
    Form(String),
    /// `/forms/content/{id}`
    FormContent(String),
    /// `/forms` (search with `count` and `formTypeId` query parameters)
    Forms,
    /// `/locations/{id}`
    Location(String),
    /// `/locations`
    Locations,
    /// `/locations/status`
    LocationStatus,
    /// `/locations/worker`
    LocationWorker,
    /// `/workers/{id}`
    Worker(String),
    /// `/workers`
    Workers,
    /// `/workers/status`
    WorkerStatus,
    /// `/workers/photo/{id}`
    WorkerPhoto(String),
    /// `/workers/{id}/locations`
    WorkerLocations(String),
    /// `/workers/permissionProfile`
    WorkerPermissionProfile,
}

impl Endpoint {
    /// Returns the path segments appended to the base URL.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Form(id) => vec!["forms", id.as_str()],
            Self::FormContent(id) => vec!["forms", "content", id.as_str()],
            Self::Forms => vec!["forms"],
            Self::Location(id) => vec!["locations", id.as_str()],
            Self::Locations => vec!["locations"],
            Self::LocationStatus => vec!["locations", "status"],
            Self::LocationWorker => vec!["locations", "worker"],
            Self::Worker(id) => vec!["workers", id.as_str()],
            Self::Workers => vec!["workers"],
            Self::WorkerStatus => vec!["workers", "status"],
            Self::WorkerPhoto(id) => vec!["workers", "photo", id.as_str()],
            Self::WorkerLocations(id) => vec!["workers", id.as_str(), "locations"],
            Self::WorkerPermissionProfile => vec!["workers", "permissionProfile"],
        }
    }

    /// Verbs the SiteDocs API exposes on this endpoint.
    #[must_use]
    pub fn methods(&self) -> &'static [Method] {
        const GET: &[Method] = &[Method::GET];
        const GET_PATCH: &[Method] = &[Method::GET, Method::PATCH];
        const GET_PUT_PATCH: &[Method] = &[Method::GET, Method::PUT, Method::PATCH];
        const DELETE_POST: &[Method] = &[Method::DELETE, Method::POST];
        match self {
            Self::Form(_)
            | Self::FormContent(_)
            | Self::Forms
            | Self::Location(_)
            | Self::WorkerPhoto(_)
            | Self::WorkerLocations(_)
            | Self::WorkerPermissionProfile => GET,
            Self::Locations => GET_PATCH,
            Self::LocationStatus | Self::LocationWorker | Self::WorkerStatus => DELETE_POST,
            Self::Worker(_) | Self::Workers => GET_PUT_PATCH,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Error returned when a path does not name a catalog endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown endpoint path: {0}")]
pub struct UnknownEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = raw.trim_matches('/').split('/').collect();
        let endpoint = match segments.as_slice() {
            ["forms"] => Self::Forms,
            ["forms", "content", id] => Self::FormContent(id.to_string()),
            ["forms", id] => Self::Form(id.to_string()),
            ["locations"] => Self::Locations,
            ["locations", "status"] => Self::LocationStatus,
            ["locations", "worker"] => Self::LocationWorker,
            ["locations", id] => Self::Location(id.to_string()),
            ["workers"] => Self::Workers,
            ["workers", "status"] => Self::WorkerStatus,
            ["workers", "permissionProfile"] => Self::WorkerPermissionProfile,
            ["workers", "photo", id] => Self::WorkerPhoto(id.to_string()),
            ["workers", id, "locations"] => Self::WorkerLocations(id.to_string()),
            ["workers", id] => Self::Worker(id.to_string()),
            _ => return Err(UnknownEndpoint(raw.to_string())),
        };
        if endpoint.segments().iter().any(|segment| segment.is_empty()) {
            return Err(UnknownEndpoint(raw.to_string()));
        }
        Ok(endpoint)
    }
}
