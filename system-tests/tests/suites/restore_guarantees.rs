// system-tests/tests/suites/restore_guarantees.rs
// ============================================================================
// Module: Restore Guarantees
// Description: Mutation scenarios driven directly against faulty stubs.
// Purpose: Pin down when restores are sent and how their failures are typed.
// Dependencies: system-tests helpers, sitedocs-conformance-core
// ============================================================================

//! Restore behavior of mutation scenarios, including dirty baselines.

use std::time::Duration;

use helpers::api_stub::StubFault;
use helpers::api_stub::StubOptions;
use helpers::artifacts::TestReporter;
use helpers::fixtures::WORKER_ID;
use helpers::fixtures::sample_world;
use helpers::fixtures::worker;
use helpers::fixtures::worker_patch;
use helpers::harness::StubHarness;
use helpers::harness::StubTiming;
use helpers::harness::ensure;
use serde_json::Value;
use serde_json::json;
use sitedocs_conformance_core::ApiClient;
use sitedocs_conformance_core::ApiRequest;
use sitedocs_conformance_core::ApiResponse;
use sitedocs_conformance_core::Endpoint;
use sitedocs_conformance_core::assertions::AssertionError;
use sitedocs_conformance_core::assertions::expect_field_eq;
use sitedocs_conformance_core::assertions::response_json;
use sitedocs_conformance_core::scenario::MutationPhase;
use sitedocs_conformance_core::scenario::MutationScenario;
use sitedocs_conformance_core::scenario::ReadCheck;
use sitedocs_conformance_core::scenario::ScenarioError;
use sitedocs_conformance_core::suite::CaseFilter;
use sitedocs_conformance_core::suite::runner::CaseOutcome;

use crate::helpers;

/// One retry and a short poll deadline.
fn healing_timing() -> StubTiming {
    StubTiming {
        retries: 1,
        retry_delay: Duration::from_millis(1),
        poll_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(20),
    }
}

/// Read of the targeted worker.
fn get_worker() -> ApiRequest {
    ApiRequest::get(Endpoint::Worker(WORKER_ID.to_string()))
}

/// Deactivate-then-reactivate scenario for the targeted worker.
fn worker_status_scenario() -> MutationScenario {
    let body = json!({ "Id": WORKER_ID });
    MutationScenario {
        label: "worker status".to_string(),
        precondition: Some(ReadCheck::contains("worker active", get_worker(), worker())),
        forward: ApiRequest::delete(Endpoint::WorkerStatus, body.clone()),
        forward_check: Some(ReadCheck::new(
            "worker deactivated",
            get_worker(),
            |response: &ApiResponse| -> Result<(), AssertionError> {
                expect_field_eq(response_json(response)?, "IsActive", &Value::Bool(false))
            },
        )),
        restore: ApiRequest::post(Endpoint::WorkerStatus, body),
        restore_check: ReadCheck::contains("worker reactivated", get_worker(), worker()),
    }
}

/// Patch-then-restore scenario for the targeted worker.
fn worker_patch_scenario() -> MutationScenario {
    MutationScenario {
        label: "patch worker".to_string(),
        precondition: Some(ReadCheck::contains("worker baseline", get_worker(), worker())),
        forward: ApiRequest::patch(Endpoint::Workers, worker_patch()),
        forward_check: Some(ReadCheck::contains("worker patched", get_worker(), worker_patch())),
        restore: ApiRequest::patch(Endpoint::Workers, worker()),
        restore_check: ReadCheck::contains("worker restored", get_worker(), worker()),
    }
}

/// Leaves the worker patched, as an interrupted earlier run would.
async fn dirty_worker(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.send(&ApiRequest::patch(Endpoint::Workers, worker_patch())).await?;
    ensure(response.status.is_success(), format!("dirtying patch returned {}", response.status))?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn forward_and_restore_failures_are_both_reported() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("forward_and_restore_failures_are_both_reported")?;
    let options = StubOptions::with_faults(&[StubFault::NoopWorkerDeactivate, StubFault::RejectRestore]);
    let harness = StubHarness::start(reporter.artifacts().root(), options, healing_timing()).await?;
    let context = harness.context()?;

    let err = worker_status_scenario()
        .run(&context.client, context.poll)
        .await
        .err()
        .ok_or("scenario passed against a broken stub")?;
    ensure(
        matches!(
            err,
            ScenarioError::RestoreFailed {
                phase: MutationPhase::ForwardCheck,
                restore_phase: MutationPhase::Restore,
                ..
            }
        ),
        format!("expected forward check and restore failures: {err}"),
    )?;
    ensure(err.left_mutated(), "a failed restore must report possible mutation")?;
    ensure(err.to_string().contains("500"), format!("restore status missing: {err}"))?;

    reporter.finish("pass", vec![err.to_string()], Vec::new())?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ignored_patch_restore_is_a_restore_check_failure() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("ignored_patch_restore_is_a_restore_check_failure")?;
    let options = StubOptions::with_faults(&[StubFault::BrokenRestore]);
    let harness = StubHarness::start(reporter.artifacts().root(), options, healing_timing()).await?;
    let context = harness.context()?;

    let err = worker_patch_scenario()
        .run(&context.client, context.poll)
        .await
        .err()
        .ok_or("scenario passed although the restore was ignored")?;
    ensure(
        matches!(
            err,
            ScenarioError::Step {
                phase: MutationPhase::RestoreCheck,
                ..
            }
        ),
        format!("expected a restore check failure: {err}"),
    )?;
    ensure(err.left_mutated(), "an unverified restore must report possible mutation")?;

    reporter.finish("pass", vec![err.to_string()], Vec::new())?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dirty_baseline_is_restored_before_the_retry() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("dirty_baseline_is_restored_before_the_retry")?;
    let harness =
        StubHarness::start(reporter.artifacts().root(), StubOptions::default(), healing_timing()).await?;
    dirty_worker(&harness.context()?.client).await?;
    let runner = harness.runner(CaseFilter {
        name_contains: Some("patch_worker_round_trip".to_string()),
        ..CaseFilter::default()
    })?;

    let report = runner.run().await;
    reporter.artifacts().write_suite(&report, &runner.context().client.transcript())?;
    let case = report.case("patch_worker_round_trip").ok_or("case missing from report")?;
    ensure(
        case.outcome == CaseOutcome::Passed && case.attempts == 2,
        format!("expected a pass on the second attempt: {}", serde_json::to_string(case)?),
    )?;
    ensure(
        harness.stub.eventual_world() == Some(sample_world()),
        "worker was not returned to the fixture state",
    )?;

    reporter.finish("pass", vec!["dirty worker healed by the first attempt".to_string()], vec![
        "suite/".to_string(),
    ])?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn dirty_baseline_with_broken_restore_skips_the_forward_request() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("dirty_baseline_with_broken_restore_skips_the_forward_request")?;
    let options = StubOptions::with_faults(&[StubFault::BrokenRestore]);
    let harness = StubHarness::start(reporter.artifacts().root(), options, healing_timing()).await?;
    let context = harness.context()?;
    dirty_worker(&context.client).await?;

    let err = worker_patch_scenario()
        .run(&context.client, context.poll)
        .await
        .err()
        .ok_or("scenario passed against a dirty worker")?;
    ensure(
        matches!(
            err,
            ScenarioError::RestoreFailed {
                phase: MutationPhase::Precondition,
                restore_phase: MutationPhase::RestoreCheck,
                ..
            }
        ),
        format!("expected precondition and restore check failures: {err}"),
    )?;
    let patches = harness
        .stub
        .requests()
        .iter()
        .filter(|request| request.authorized && request.method == "PATCH")
        .count();
    ensure(patches == 2, format!("expected the dirtying patch and one restore, got {patches} patches"))?;

    reporter.finish("pass", vec![err.to_string()], Vec::new())?;
    drop(reporter);
    Ok(())
}
