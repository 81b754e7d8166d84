// system-tests/tests/suites/live_api.rs
// ============================================================================
// Module: Live API Checks
// Description: Conformance catalog against a configured SiteDocs environment.
// Purpose: Record live results as artifacts and fail on any failed case.
// Dependencies: system-tests helpers, sitedocs-conformance-core
// ============================================================================

//! Live catalog run; read-only unless mutation is explicitly allowed.

use helpers::artifacts::TestReporter;
use helpers::readiness::wait_for_api_ready;
use sitedocs_conformance_core::ConformanceConfig;
use sitedocs_conformance_core::SuiteContext;
use sitedocs_conformance_core::SuiteRunner;
use sitedocs_conformance_core::suite::CaseFilter;
use sitedocs_conformance_core::suite::runner::CaseOutcome;
use system_tests::config::SystemTestConfig;
use system_tests::config::SystemTestEnv;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn live_catalog_conforms() -> Result<(), Box<dyn std::error::Error>> {
    let settings = SystemTestConfig::load()?;
    let path = settings.config.clone().ok_or_else(|| {
        format!("{} must name a conformance config file or directory", SystemTestEnv::Config.as_str())
    })?;
    let mut reporter = TestReporter::new("live_catalog_conforms")?;

    let mut config = ConformanceConfig::load(Some(&path))?;
    if let Some(timeout) = settings.timeout {
        config.http_timeout = timeout;
    }
    let context = SuiteContext::from_config(&config)?;
    wait_for_api_ready(&context.client, config.http_timeout).await?;

    let filter = CaseFilter {
        read_only: !settings.allow_mutation,
        ..CaseFilter::default()
    };
    let runner = SuiteRunner::new(context, config.retry).with_filter(filter);
    let report = runner.run().await;
    reporter.artifacts().write_suite(&report, &runner.context().client.transcript())?;

    let failed: Vec<String> = report
        .cases
        .iter()
        .filter(|case| matches!(case.outcome, CaseOutcome::Failed { .. }))
        .map(|case| format!("{}::{}", case.group, case.name))
        .collect();
    let mode = if settings.allow_mutation { "mutating" } else { "read-only" };
    let mut notes = vec![format!(
        "{mode} run: {} passed, {} failed, {} skipped",
        report.passed, report.failed, report.skipped
    )];
    notes.extend(failed.iter().map(|name| format!("failed: {name}")));
    let status = if report.is_success() { "pass" } else { "fail" };
    reporter.finish(status, notes, vec!["suite/".to_string()])?;
    drop(reporter);

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("live cases failed: {}", failed.join(", ")).into())
    }
}
