// system-tests/tests/suites/alert_conditions.rs
// ============================================================================
// Module: Alert Condition Tests
// Description: Compare operator and match type scenarios against a live stack.
// Purpose: Verify planted telemetry produces (or withholds) webhook alerts.
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

use alert_harness_core::AlertTestCase;
use tokio::time::timeout;

use crate::helpers::artifacts::TestReporter;
use crate::helpers::harness::StackHarness;
use crate::helpers::scenarios;
use crate::helpers::timeouts::resolve_timeout;

type TestResult = Result<(), String>;

/// Runs every case on one stack, then reports all failures together.
async fn run_suite(test_name: &str, cases: Vec<AlertTestCase>, budget: Duration) -> TestResult {
    let mut reporter = TestReporter::new(test_name).map_err(|err| err.to_string())?;
    let mut harness = StackHarness::start().await?;
    let run = async {
        for case in &cases {
            let _ = harness.run_case(case, &mut reporter).await;
        }
    };
    let budget = resolve_timeout(budget);
    let timed_out = timeout(budget, run).await.is_err();
    harness.shutdown().await;

    let mut notes = reporter.failures();
    if timed_out {
        notes.push(format!("suite exceeded {}s", budget.as_secs()));
    }
    let status = if notes.is_empty() { "pass" } else { "fail" };
    reporter.finish(status, notes.clone()).map_err(|err| err.to_string())?;
    if notes.is_empty() { Ok(()) } else { Err(notes.join("; ")) }
}

/// Container names are fixed, so the whole seed set shares one stack.
#[tokio::test(flavor = "multi_thread")]
async fn seed_conditions_match_expectations() -> TestResult {
    let mut cases = scenarios::firing_cases();
    cases.push(scenarios::above_all_the_time_silent());
    let budget = Duration::from_secs(
        scenarios::FIRE_WAIT_SEC * 6 + scenarios::SILENCE_WAIT_SEC * 2,
    );
    run_suite("seed_conditions_match_expectations", cases, budget).await
}
