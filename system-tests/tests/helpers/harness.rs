// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Stack Harness
// Description: Provisioned stack plus orchestrator shared by one suite.
// Purpose: Run alert test cases against real containers and clean up after.
// Dependencies: alert-harness-core, alert-harness-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! [`StackHarness::start`] loads the harness config (`ALERT_HARNESS_*`),
//! provisions or reuses the stack, and logs the admin in. Suites run cases
//! through [`StackHarness::run_case`] and always finish with
//! [`StackHarness::shutdown`], which deletes installed rules, truncates
//! planted telemetry, and releases non-cached resources.

use alert_harness_config::HarnessConfig;
use alert_harness_core::AlertTestCase;
use alert_harness_core::Orchestrator;
use alert_harness_core::TestEnvironment;
use system_tests::config::SystemTestConfig;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use super::artifacts::TestReporter;

/// Installs a test-writer subscriber once per binary.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// A ready stack and the orchestrator bound to it.
pub struct StackHarness {
    environment: TestEnvironment,
    orchestrator: Orchestrator,
    keep_telemetry: bool,
}

impl StackHarness {
    pub async fn start() -> Result<Self, String> {
        init_tracing();
        let system = SystemTestConfig::load()?;
        let config = HarnessConfig::load(None).map_err(|err| format!("harness config: {err}"))?;
        let mut environment = TestEnvironment::provision(config)
            .await
            .map_err(|err| format!("provisioning failed: {err}"))?;
        let orchestrator = match environment.orchestrator().await {
            Ok(orchestrator) => orchestrator,
            Err(err) => {
                environment.teardown().await;
                return Err(format!("admin session failed: {err}"));
            }
        };
        Ok(Self {
            environment,
            orchestrator,
            keep_telemetry: system.keep_telemetry,
        })
    }

    pub const fn environment(&self) -> &TestEnvironment {
        &self.environment
    }

    pub fn orchestrator(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// Runs one case and records its outcome with the reporter.
    pub async fn run_case(
        &mut self,
        case: &AlertTestCase,
        reporter: &mut TestReporter,
    ) -> Result<(), String> {
        match self.orchestrator.run_case(case).await {
            Ok(outcome) => {
                reporter.case_passed(&outcome.case, &outcome.observed_alerts);
                Ok(())
            }
            Err(err) => {
                let detail = err.to_string();
                reporter.case_failed(&case.name, &detail);
                Err(format!("{}: {detail}", case.name))
            }
        }
    }

    pub async fn shutdown(mut self) {
        self.orchestrator.cleanup().await;
        if !self.keep_telemetry {
            if let Err(err) = self.environment.ingestor().truncate().await {
                warn!(error = %err, "telemetry truncation failed");
            }
        }
        self.environment.teardown().await;
    }
}
