// crates/sitedocs-conformance-core/src/retry.rs
// ============================================================================
// Module: Retry and Polling
// Description: Whole-case retries and poll-until-visible reads.
// Purpose: Absorb eventual consistency without fixed sleeps.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! Two waiting strategies are provided:
//! - [`run_with_retries`] reruns an entire conformance case with a fixed
//!   delay between attempts. Intermediate failures are logged at debug level
//!   only; the final failure is returned to the caller.
//! - [`poll_until`] repeats a single read until its predicate holds or the
//!   deadline passes, returning the last observation on timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio::time::sleep;
use tracing::debug;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 8;
/// Default delay between whole-case attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Default deadline for a single poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default interval between poll probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound accepted for configured retries.
pub const MAX_RETRIES: u32 = 32;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Whole-case retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy that runs each case exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Total attempts including the first.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Errors that decide whether another attempt is worthwhile.
pub trait Retryable {
    /// Returns false when rerunning cannot change the outcome.
    fn is_retryable(&self) -> bool;
}

/// Result of [`run_with_retries`].
#[derive(Debug)]
pub struct Attempted<T, E> {
    /// Final result of the operation.
    pub result: Result<T, E>,
    /// Attempts made, including the first.
    pub attempts: u32,
}

/// Runs `op` until it succeeds, returns a non-retryable error, or the policy
/// is exhausted.
pub async fn run_with_retries<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Attempted<T, E>
where
    E: Retryable + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.attempts();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match op().await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(err) if !err.is_retryable() || attempts >= max_attempts => {
                return Attempted {
                    result: Err(err),
                    attempts,
                };
            }
            Err(err) => {
                debug!(case = label, attempt = attempts, error = %err, "attempt failed; retrying");
                sleep(policy.delay).await;
            }
        }
    }
}

// ============================================================================
// SECTION: Polling
// ============================================================================

/// Deadline and cadence for [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total time allowed before giving up.
    pub timeout: Duration,
    /// Delay between probes.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Poll failure carrying the last observation error.
#[derive(Debug, Error)]
#[error("{label} not observed after {attempts} attempts in {} ms: {last}", .elapsed.as_millis())]
pub struct PollTimeout<E> {
    /// What was being waited for.
    pub label: String,
    /// Probes issued.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed: Duration,
    /// Error from the final probe.
    pub last: E,
}

/// Probes until `probe` returns `Ok` or the policy deadline passes.
///
/// The first probe runs immediately. Polling stops once the next probe would
/// start after the deadline; a probe already in flight is allowed to finish.
///
/// # Errors
///
/// Returns [`PollTimeout`] with the last probe error when the predicate
/// never held.
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    label: &str,
    mut probe: F,
) -> Result<T, PollTimeout<E>>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match probe().await {
            Ok(value) => {
                debug!(target_state = label, attempts, "state observed");
                return Ok(value);
            }
            Err(err) => {
                let elapsed = start.elapsed();
                if elapsed.saturating_add(policy.interval) > policy.timeout {
                    return Err(PollTimeout {
                        label: label.to_string(),
                        attempts,
                        elapsed,
                        last: err,
                    });
                }
                debug!(target_state = label, attempts, error = %err, "state not yet visible");
                sleep(policy.interval).await;
            }
        }
    }
}
