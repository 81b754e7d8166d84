// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Stub Harness
// Description: Wires a running API stub to a conformance suite runner.
// Purpose: Give each test a fresh stub, fixture directory, and config.
// Dependencies: sitedocs-conformance-core, tokio
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use sitedocs_conformance_core::ConformanceConfig;
use sitedocs_conformance_core::SuiteContext;
use sitedocs_conformance_core::SuiteRunner;
use sitedocs_conformance_core::config::ConfigSource;
use sitedocs_conformance_core::config::EnvOverrides;
use sitedocs_conformance_core::suite::CaseFilter;

use super::api_stub::ApiStubHandle;
use super::api_stub::StubOptions;
use super::api_stub::spawn_api_stub;
use super::fixtures::sample_world;
use super::fixtures::write_fixture_dir;
use super::readiness::wait_for_api_ready;

/// Name of the generated config file.
const CONFIG_FILE: &str = "conformance.toml";

/// Timing used against the stub: one retry, fast polling.
#[derive(Debug, Clone, Copy)]
pub struct StubTiming {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
    /// Poll deadline.
    pub poll_timeout: Duration,
    /// Poll interval.
    pub poll_interval: Duration,
}

impl Default for StubTiming {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay: Duration::from_millis(10),
            poll_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// A running stub plus the config pointing at it.
pub struct StubHarness {
    /// Stub server; stops when dropped.
    pub stub: ApiStubHandle,
    /// Config loaded from the generated TOML file.
    pub config: ConformanceConfig,
    /// Path of the generated TOML file.
    pub config_path: PathBuf,
}

impl StubHarness {
    /// Starts a stub seeded with the sample world and writes fixtures and a
    /// config file under `root`.
    pub async fn start(root: &Path, options: StubOptions, timing: StubTiming) -> Result<Self, String> {
        let api_key = options.api_key.clone();
        let stub = spawn_api_stub(sample_world(), options)?;
        let fixtures_dir = write_fixture_dir(root)?;
        let config_path = root.join(CONFIG_FILE);
        let relative_fixtures = fixtures_dir.strip_prefix(root).map_err(|err| err.to_string())?;
        let text = config_toml(stub.base_url(), &api_key, relative_fixtures, timing);
        fs::write(&config_path, text).map_err(|err| format!("write config: {err}"))?;
        let config = ConformanceConfig::from_toml_str(
            &fs::read_to_string(&config_path).map_err(|err| format!("read config: {err}"))?,
            root,
            &EnvOverrides::default(),
            ConfigSource::File(config_path.clone()),
        )
        .map_err(|err| err.to_string())?;
        let harness = Self {
            stub,
            config,
            config_path,
        };
        let context = harness.context()?;
        wait_for_api_ready(&context.client, Duration::from_secs(5)).await?;
        Ok(harness)
    }

    /// Fresh suite context with an empty transcript.
    pub fn context(&self) -> Result<SuiteContext, String> {
        SuiteContext::from_config(&self.config).map_err(|err| err.to_string())
    }

    /// Runner over the selected cases using the configured retry policy.
    pub fn runner(&self, filter: CaseFilter) -> Result<SuiteRunner, String> {
        Ok(SuiteRunner::new(self.context()?, self.config.retry).with_filter(filter))
    }
}

/// Renders the TOML config for a stub run; `fixtures_dir` is relative to the
/// config file.
fn config_toml(base_url: &str, api_key: &str, fixtures_dir: &Path, timing: StubTiming) -> String {
    format!(
        "base_url = \"{base_url}\"\n\
         api_key = \"{api_key}\"\n\
         fixtures_dir = '{fixtures}'\n\
         \n\
         [retry]\n\
         retries = {retries}\n\
         delay_ms = {delay}\n\
         \n\
         [consistency]\n\
         poll_timeout_ms = {poll_timeout}\n\
         poll_interval_ms = {poll_interval}\n\
         \n\
         [http]\n\
         timeout_ms = 5000\n",
        fixtures = fixtures_dir.display(),
        retries = timing.retries,
        delay = timing.retry_delay.as_millis(),
        poll_timeout = timing.poll_timeout.as_millis(),
        poll_interval = timing.poll_interval.as_millis(),
    )
}

/// Fails with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), String> {
    if condition { Ok(()) } else { Err(message.into()) }
}
