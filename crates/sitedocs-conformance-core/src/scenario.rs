// crates/sitedocs-conformance-core/src/scenario.rs
// ============================================================================
// Module: Mutation Scenarios
// Description: Forward mutation, verification, and guaranteed restore steps.
// Purpose: Leave remote entities in their baseline state after every run.
// Dependencies: reqwest, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`MutationScenario`] is a single conformance case that changes remote
//! state and puts it back:
//!
//! ```text
//! precondition (poll) -> forward (200) -> forward_check (poll)
//!                     -> restore (200) -> restore_check (poll)
//! ```
//!
//! Once the forward request has been issued the restore request is always
//! attempted, even when the forward request or its verification failed. A
//! baseline that never becomes visible is restored too before the case fails.
//! Reads are wrapped in [`ReadCheck`] and polled until the expected state is
//! visible, so eventual consistency never needs a fixed sleep.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::assertions::AssertionError;
use crate::assertions::expect_contains;
use crate::assertions::expect_status;
use crate::assertions::response_json;
use crate::client::ApiClient;
use crate::client::ApiRequest;
use crate::client::ApiResponse;
use crate::client::ClientError;
use crate::retry::PollPolicy;
use crate::retry::PollTimeout;
use crate::retry::poll_until;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Step within a mutation scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// Baseline read before mutating.
    Precondition,
    /// The mutating request.
    Forward,
    /// Polling for the mutated state.
    ForwardCheck,
    /// The compensating request.
    Restore,
    /// Polling for the baseline state.
    RestoreCheck,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Precondition => "precondition",
            Self::Forward => "forward request",
            Self::ForwardCheck => "forward check",
            Self::Restore => "restore request",
            Self::RestoreCheck => "restore check",
        })
    }
}

/// Failure of a single request or read.
#[derive(Debug, Error)]
pub enum StepError {
    /// No response was obtained.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The response did not meet the expectation.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// The expected state never became visible.
    #[error(transparent)]
    Poll(Box<PollTimeout<Self>>),
}

impl From<PollTimeout<Self>> for StepError {
    fn from(timeout: PollTimeout<Self>) -> Self {
        Self::Poll(Box::new(timeout))
    }
}

/// Scenario failure tagged with the phase it occurred in.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// One phase failed; the baseline state was restored afterwards.
    #[error("{label}: {phase} failed: {source}")]
    Step {
        /// Scenario label.
        label: String,
        /// Failing phase.
        phase: MutationPhase,
        /// Underlying failure.
        source: StepError,
    },
    /// A precondition or forward phase failed and the restore failed as well.
    #[error("{label}: {phase} failed: {source}; {restore_phase} also failed: {restore}")]
    RestoreFailed {
        /// Scenario label.
        label: String,
        /// Failing forward phase.
        phase: MutationPhase,
        /// Forward failure.
        source: StepError,
        /// Failing restore phase.
        restore_phase: MutationPhase,
        /// Restore failure.
        restore: Box<StepError>,
    },
}

impl ScenarioError {
    /// Phase of the first failure.
    #[must_use]
    pub const fn phase(&self) -> MutationPhase {
        match self {
            Self::Step {
                phase, ..
            }
            | Self::RestoreFailed {
                phase, ..
            } => *phase,
        }
    }

    /// Returns true when the remote entity may have been left mutated.
    #[must_use]
    pub const fn left_mutated(&self) -> bool {
        match self {
            Self::RestoreFailed {
                ..
            } => true,
            Self::Step {
                phase, ..
            } => matches!(phase, MutationPhase::Restore | MutationPhase::RestoreCheck),
        }
    }
}

// ============================================================================
// SECTION: Read Checks
// ============================================================================

/// Predicate evaluated against a read response.
pub type Predicate = Box<dyn Fn(&ApiResponse) -> Result<(), AssertionError> + Send + Sync>;

/// A read request plus the predicate its response must satisfy.
pub struct ReadCheck {
    /// What the check waits for, used in logs and errors.
    pub label: String,
    /// Read request to issue.
    pub request: ApiRequest,
    /// Expectation over the response.
    predicate: Predicate,
}

impl fmt::Debug for ReadCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadCheck")
            .field("label", &self.label)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl ReadCheck {
    /// Builds a check from an arbitrary predicate.
    pub fn new(
        label: impl Into<String>,
        request: ApiRequest,
        predicate: impl Fn(&ApiResponse) -> Result<(), AssertionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            request,
            predicate: Box::new(predicate),
        }
    }

    /// Builds a check expecting `200 OK` with a body containing `expected`.
    #[must_use]
    pub fn contains(label: impl Into<String>, request: ApiRequest, expected: Value) -> Self {
        Self::new(label, request, move |response| {
            expect_status(response, StatusCode::OK)?;
            expect_contains(response_json(response)?, &expected)
        })
    }

    /// Issues the read once and evaluates the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] when the request fails or the predicate rejects it.
    pub async fn observe(&self, client: &ApiClient) -> Result<(), StepError> {
        let response = client.send(&self.request).await?;
        (self.predicate)(&response)?;
        Ok(())
    }

    /// Polls the read until the predicate holds or the policy deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Poll`] carrying the last observation on timeout.
    pub async fn poll(&self, client: &ApiClient, policy: PollPolicy) -> Result<(), StepError> {
        poll_until(policy, &self.label, move || self.observe(client)).await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Snapshot-and-restore mutation case.
#[derive(Debug)]
pub struct MutationScenario {
    /// Scenario label.
    pub label: String,
    /// Baseline read that must hold before mutating.
    pub precondition: Option<ReadCheck>,
    /// Mutating request; must return `200 OK`.
    pub forward: ApiRequest,
    /// Read confirming the mutation became visible.
    pub forward_check: Option<ReadCheck>,
    /// Compensating request; must return `200 OK`.
    pub restore: ApiRequest,
    /// Read confirming the baseline is visible again.
    pub restore_check: ReadCheck,
}

impl MutationScenario {
    /// Runs every step, restoring the baseline whenever the forward request
    /// was issued.
    ///
    /// A precondition that does not hold within the poll deadline is treated
    /// as a dirty baseline: the restore request is sent and the baseline
    /// polled before the precondition failure is returned, so a retried case
    /// starts from the fixture state.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] naming the failing phase, and the restore
    /// failure as well when both sides failed.
    pub async fn run(&self, client: &ApiClient, poll: PollPolicy) -> Result<(), ScenarioError> {
        if let Some(precondition) = &self.precondition
            && let Err(err) = precondition.poll(client, poll).await
        {
            warn!(scenario = %self.label, error = %err, "baseline not observed; restoring before retry");
            let restore = self.restore_baseline(client, poll).await;
            return self.outcome(Err((MutationPhase::Precondition, err)), restore);
        }

        debug!(scenario = %self.label, "issuing forward mutation");
        let forward = match send_expect_ok(client, &self.forward).await {
            Ok(()) => match &self.forward_check {
                Some(check) => {
                    check.poll(client, poll).await.map_err(|err| (MutationPhase::ForwardCheck, err))
                }
                None => Ok(()),
            },
            Err(err) => Err((MutationPhase::Forward, err)),
        };

        let restore = self.restore_baseline(client, poll).await;
        self.outcome(forward, restore)
    }

    /// Sends the restore request and polls for the baseline.
    async fn restore_baseline(&self, client: &ApiClient, poll: PollPolicy) -> PhaseResult {
        debug!(scenario = %self.label, "restoring baseline");
        let restore = match send_expect_ok(client, &self.restore).await {
            Ok(()) => self
                .restore_check
                .poll(client, poll)
                .await
                .map_err(|err| (MutationPhase::RestoreCheck, err)),
            Err(err) => Err((MutationPhase::Restore, err)),
        };
        if let Err((phase, err)) = &restore {
            warn!(scenario = %self.label, %phase, error = %err, "baseline restore failed");
        }
        restore
    }

    /// Folds the forward and restore results into the scenario result.
    fn outcome(&self, forward: PhaseResult, restore: PhaseResult) -> Result<(), ScenarioError> {
        match (forward, restore) {
            (Ok(()), Ok(())) => Ok(()),
            (Err((phase, source)), Ok(())) | (Ok(()), Err((phase, source))) => {
                Err(ScenarioError::Step {
                    label: self.label.clone(),
                    phase,
                    source,
                })
            }
            (Err((phase, source)), Err((restore_phase, restore))) => {
                Err(ScenarioError::RestoreFailed {
                    label: self.label.clone(),
                    phase,
                    source,
                    restore_phase,
                    restore: Box::new(restore),
                })
            }
        }
    }
}

/// Result of one side of a scenario, tagged with the failing phase.
type PhaseResult = Result<(), (MutationPhase, StepError)>;

/// Sends a request and requires `200 OK`.
async fn send_expect_ok(client: &ApiClient, request: &ApiRequest) -> Result<(), StepError> {
    let response = client.send(request).await?;
    expect_status(&response, StatusCode::OK)?;
    Ok(())
}
