// system-tests/tests/helpers/timeouts.rs
// ============================================================================
// Module: Suite Budgets
// Description: Per-suite time budgets with an environment floor.
// Purpose: Let slow machines stretch suite budgets without editing tests.
// Dependencies: system-tests
// ============================================================================

use std::time::Duration;

use system_tests::config::SystemTestConfig;

/// Returns `requested`, raised to `ALERT_HARNESS_SYSTEM_TEST_TIMEOUT_SEC`
/// when that is larger. Panics on a malformed override.
#[must_use]
pub fn resolve_timeout(requested: Duration) -> Duration {
    match SystemTestConfig::load() {
        Ok(config) => config.timeout.map_or(requested, |floor| floor.max(requested)),
        Err(err) => panic!("suite budget: {err}"),
    }
}
