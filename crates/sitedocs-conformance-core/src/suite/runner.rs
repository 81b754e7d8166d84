// crates/sitedocs-conformance-core/src/suite/runner.rs
// ============================================================================
// Module: Suite Runner
// Description: Sequential execution of selected cases with whole-case retries.
// Purpose: Produce a serializable report of every case outcome.
// Dependencies: serde, tokio, tracing
// ============================================================================

//! ## Overview
//! [`SuiteRunner`] executes the selected cases one at a time in catalog
//! order. Each case is wrapped in [`run_with_retries`]; only the final
//! outcome is recorded. Cases never run concurrently because mutating cases
//! share remote state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use serde::Serialize;
use tracing::info;
use tracing::warn;

use super::Case;
use super::CaseError;
use super::CaseFilter;
use super::Group;
use super::SuiteContext;
use crate::retry::RetryPolicy;
use crate::retry::run_with_retries;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Final outcome of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// Every expectation held.
    Passed,
    /// The last attempt failed.
    Failed {
        /// Rendered error of the last attempt.
        error: String,
    },
    /// The case could not run.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// Report entry for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    /// Case group.
    pub group: Group,
    /// Case name.
    pub name: String,
    /// Final outcome.
    pub outcome: CaseOutcome,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Wall-clock duration across all attempts.
    pub duration_ms: u64,
}

/// Report for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Case reports in execution order.
    pub cases: Vec<CaseReport>,
    /// Cases that passed.
    pub passed: usize,
    /// Cases that failed.
    pub failed: usize,
    /// Cases that were skipped.
    pub skipped: usize,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

impl SuiteReport {
    /// Appends a case report and updates the counters.
    pub fn push(&mut self, report: CaseReport) {
        match report.outcome {
            CaseOutcome::Passed => self.passed += 1,
            CaseOutcome::Failed {
                ..
            } => self.failed += 1,
            CaseOutcome::Skipped {
                ..
            } => self.skipped += 1,
        }
        self.cases.push(report);
    }

    /// Returns true when no case failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Looks up a case report by name.
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|case| case.name == name)
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs selected cases against one context.
pub struct SuiteRunner {
    /// Shared case context.
    context: SuiteContext,
    /// Whole-case retry policy.
    retry: RetryPolicy,
    /// Case selection.
    filter: CaseFilter,
}

impl SuiteRunner {
    /// Creates a runner selecting every case.
    #[must_use]
    pub fn new(context: SuiteContext, retry: RetryPolicy) -> Self {
        Self {
            context,
            retry,
            filter: CaseFilter::default(),
        }
    }

    /// Restricts the cases that run.
    #[must_use]
    pub fn with_filter(mut self, filter: CaseFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the shared context.
    #[must_use]
    pub const fn context(&self) -> &SuiteContext {
        &self.context
    }

    /// Cases this runner will execute, in order.
    #[must_use]
    pub fn selected(&self) -> Vec<Case> {
        self.filter.select()
    }

    /// Runs every selected case sequentially.
    pub async fn run(&self) -> SuiteReport {
        let started = Instant::now();
        let mut report = SuiteReport::default();
        for case in self.selected() {
            report.push(self.run_case(case).await);
        }
        report.duration_ms = elapsed_ms(started);
        info!(
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "suite finished"
        );
        report
    }

    /// Runs one case under the retry policy.
    async fn run_case(&self, case: Case) -> CaseReport {
        let label = format!("{}::{}", case.group, case.name);
        let started = Instant::now();
        let attempted =
            run_with_retries(self.retry, &label, || (case.run)(&self.context)).await;
        let outcome = match attempted.result {
            Ok(()) => {
                info!(case = %label, attempts = attempted.attempts, "case passed");
                CaseOutcome::Passed
            }
            Err(CaseError::Skipped(reason)) => {
                info!(case = %label, reason = %reason, "case skipped");
                CaseOutcome::Skipped {
                    reason,
                }
            }
            Err(err) => {
                warn!(case = %label, attempts = attempted.attempts, error = %err, "case failed");
                CaseOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        CaseReport {
            group: case.group,
            name: case.name.to_string(),
            outcome,
            attempts: attempted.attempts,
            duration_ms: elapsed_ms(started),
        }
    }
}

/// Milliseconds since `started`, saturating.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
