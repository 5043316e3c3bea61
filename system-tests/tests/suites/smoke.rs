// system-tests/tests/suites/smoke.rs
// ============================================================================
// Module: Smoke Tests
// Description: Stack bring-up and webhook channel sanity checks.
// Purpose: Fail fast on broken provisioning before running alert scenarios.
// Dependencies: system-tests helpers, alert-harness-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::time::Duration;

use alert_harness_core::ChannelSpec;
use alert_harness_core::ControlPlane;
use alert_harness_core::MockReceiver;
use alert_harness_core::RecordedRequest;
use alert_harness_core::StubMapping;
use tokio::time::Instant;

use crate::helpers::artifacts::TestReporter;
use crate::helpers::harness::StackHarness;
use crate::helpers::timeouts::resolve_timeout;

type TestResult = Result<(), String>;

#[tokio::test(flavor = "multi_thread")]
async fn channel_test_notification_reaches_mock_receiver() -> TestResult {
    let mut reporter = TestReporter::new("channel_test_notification_reaches_mock_receiver")
        .map_err(|err| err.to_string())?;
    let harness = StackHarness::start().await?;
    let result = check_channel(&harness).await;
    harness.shutdown().await;

    let status = if result.is_ok() { "pass" } else { "fail" };
    let notes = result.as_ref().err().cloned().into_iter().collect();
    reporter.finish(status, notes).map_err(|err| err.to_string())?;
    result
}

async fn check_channel(harness: &StackHarness) -> TestResult {
    let environment = harness.environment();
    let receiver = environment.receiver().map_err(|err| err.to_string())?;
    let control = environment.control_plane().await.map_err(|err| err.to_string())?;

    let name = format!("smoke-{}", alert_harness_core::telemetry::now_millis());
    let path = format!("/alert/{name}");
    receiver
        .install_stubs(&[StubMapping::new("POST", &path)])
        .await
        .map_err(|err| err.to_string())?;
    let channel = ChannelSpec {
        name: name.clone(),
        url: format!("{}{path}", environment.endpoints().mock_container_url.trim_end_matches('/')),
        send_resolved: false,
    };

    let first = control.ensure_channel(&channel).await.map_err(|err| err.to_string())?;
    let second = control.ensure_channel(&channel).await.map_err(|err| err.to_string())?;
    if first != second {
        return Err(format!("channel id changed between calls: {first} then {second}"));
    }

    control.test_channel(&channel).await.map_err(|err| err.to_string())?;
    let deadline = Instant::now() + resolve_timeout(Duration::from_secs(60));
    let any = |requests: &[RecordedRequest]| !requests.is_empty();
    let requests = receiver
        .wait_for_requests("POST", &path, &any, deadline)
        .await
        .map_err(|err| err.to_string())?;
    if requests.is_empty() {
        return Err(format!("no test notification arrived at {path}"));
    }
    receiver.reset_journal().await.map_err(|err| err.to_string())
}
