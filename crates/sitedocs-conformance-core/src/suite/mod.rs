// crates/sitedocs-conformance-core/src/suite/mod.rs
// ============================================================================
// Module: Conformance Case Catalog
// Description: Case declarations grouped by SiteDocs resource.
// Purpose: Define the catalog, shared case context, and case-level errors.
// Dependencies: reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! Each [`Case`] is a named async function over a [`SuiteContext`]. Cases are
//! grouped by resource and run in catalog order: forms, locations, workers.
//! Whole cases are retried by the runner; a case that reports
//! [`CaseError::Skipped`] is never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use reqwest::Method;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::assertions::AssertionError;
use crate::assertions::expect_status;
use crate::client::ApiClient;
use crate::client::ApiRequest;
use crate::client::ClientError;
use crate::config::ConformanceConfig;
use crate::credential::Credential;
use crate::endpoints::Endpoint;
use crate::fixtures::FixtureError;
use crate::fixtures::FixtureSet;
use crate::retry::PollPolicy;
use crate::retry::Retryable;
use crate::scenario::ScenarioError;
use crate::scenario::StepError;

mod forms;
mod locations;
pub mod runner;
mod workers;


// ============================================================================
// SECTION: Groups
// ============================================================================

/// Resource group a case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// `/forms` endpoints.
    Forms,
    /// `/locations` endpoints.
    Locations,
    /// `/workers` endpoints.
    Workers,
}

impl Group {
    /// Every group in catalog order.
    pub const ALL: [Self; 3] = [Self::Forms, Self::Locations, Self::Workers];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forms => "forms",
            Self::Locations => "locations",
            Self::Workers => "workers",
        }
    }

    /// Cases declared for this group.
    #[must_use]
    pub const fn cases(self) -> &'static [Case] {
        match self {
            Self::Forms => forms::CASES,
            Self::Locations => locations::CASES,
            Self::Workers => workers::CASES,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognized group name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown group '{0}' (expected forms, locations, or workers)")]
pub struct UnknownGroup(pub String);

impl FromStr for Group {
    type Err = UnknownGroup;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "forms" => Ok(Self::Forms),
            "locations" => Ok(Self::Locations),
            "workers" => Ok(Self::Workers),
            _ => Err(UnknownGroup(raw.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Setup failures before any case runs.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Fixtures could not be loaded.
    #[error(transparent)]
    Fixtures(#[from] FixtureError),
    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Shared state every case reads.
#[derive(Clone)]
pub struct SuiteContext {
    /// API client.
    pub client: ApiClient,
    /// Loaded fixtures.
    pub fixtures: FixtureSet,
    /// Poll policy for eventual-consistency reads.
    pub poll: PollPolicy,
}

impl SuiteContext {
    /// Builds a context with an existing client and fixtures.
    #[must_use]
    pub const fn new(client: ApiClient, fixtures: FixtureSet, poll: PollPolicy) -> Self {
        Self {
            client,
            fixtures,
            poll,
        }
    }

    /// Builds the client and loads fixtures from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when fixtures are missing or malformed.
    pub fn from_config(config: &ConformanceConfig) -> Result<Self, SetupError> {
        let fixtures = FixtureSet::load(&config.fixtures_dir)?;
        let client = ApiClient::from_config(config)?;
        Ok(Self::new(client, fixtures, config.poll))
    }
}

// ============================================================================
// SECTION: Case Errors
// ============================================================================

/// Failure of a single case.
#[derive(Debug, Error)]
pub enum CaseError {
    /// No response was obtained.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// An expectation failed.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// A polled read or single step failed.
    #[error(transparent)]
    Step(#[from] StepError),
    /// A mutation scenario failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// An expectation failed for a specific request within a sweep.
    #[error("{request}: {source}")]
    Request {
        /// Method and path of the failing request.
        request: String,
        /// Underlying failure.
        source: AssertionError,
    },
    /// The case cannot run with the available fixtures.
    #[error("skipped: {0}")]
    Skipped(String),
}

impl Retryable for CaseError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

// ============================================================================
// SECTION: Cases
// ============================================================================

/// Boxed future returned by case functions.
pub type CaseFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CaseError>> + Send + 'a>>;

/// Case entry point.
pub type CaseFn = for<'a> fn(&'a SuiteContext) -> CaseFuture<'a>;

/// One named conformance case.
#[derive(Clone, Copy)]
pub struct Case {
    /// Group the case belongs to.
    pub group: Group,
    /// Stable case name.
    pub name: &'static str,
    /// Whether the case changes remote state (and restores it).
    pub mutates: bool,
    /// Case entry point.
    pub run: CaseFn,
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("mutates", &self.mutates)
            .finish()
    }
}

/// Every case in catalog order.
#[must_use]
pub fn catalog() -> Vec<Case> {
    Group::ALL.iter().flat_map(|group| group.cases().iter().copied()).collect()
}

/// Case selection by group and name substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFilter {
    /// Groups to include; empty means all.
    pub groups: Vec<Group>,
    /// Substring the case name must contain.
    pub name_contains: Option<String>,
    /// Excludes cases that mutate remote state.
    pub read_only: bool,
}

impl CaseFilter {
    /// Returns true when the case is selected.
    #[must_use]
    pub fn matches(&self, case: &Case) -> bool {
        let group_ok = self.groups.is_empty() || self.groups.contains(&case.group);
        let name_ok =
            self.name_contains.as_deref().is_none_or(|needle| case.name.contains(needle));
        group_ok && name_ok && !(self.read_only && case.mutates)
    }

    /// Selected cases in catalog order.
    #[must_use]
    pub fn select(&self) -> Vec<Case> {
        catalog().into_iter().filter(|case| self.matches(case)).collect()
    }
}

// ============================================================================
// SECTION: Shared Case Helpers
// ============================================================================

/// Issues every verb an endpoint exposes with the sentinel credential and
/// requires `401 Unauthorized` from each.
pub(crate) async fn reject_sentinel(
    ctx: &SuiteContext,
    endpoints: &[(Endpoint, Value)],
) -> Result<(), CaseError> {
    for (endpoint, body) in endpoints {
        for method in endpoint.methods() {
            let mut request =
                ApiRequest::new(method.clone(), endpoint.clone()).with_credential(Credential::Sentinel);
            if *method != Method::GET {
                request = request.with_body(body.clone());
            }
            let response = ctx.client.send(&request).await?;
            expect_status(&response, StatusCode::UNAUTHORIZED).map_err(|source| {
                CaseError::Request {
                    request: format!("{} {}", request.method, request.display_path()),
                    source,
                }
            })?;
        }
    }
    Ok(())
}

/// Body used for sentinel probes that do not need a meaningful payload.
pub(crate) fn empty_body() -> Value {
    json!({})
}
