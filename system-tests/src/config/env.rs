// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Suite-level knobs read from `ALERT_HARNESS_SYSTEM_TEST_*`.
// Purpose: Shape artifact location, suite budget, and telemetry retention.
// Dependencies: alert-harness-config
// ============================================================================

//! ## Overview
//! These variables tune how the suites run, not what they run against. They
//! go through the harness config's strict readers, so an empty or malformed
//! value stops the suite instead of falling back to a default.

use std::path::PathBuf;
use std::time::Duration;

use alert_harness_config::ConfigError;
use alert_harness_config::parse_bool;
use alert_harness_config::parse_timeout_seconds;
use alert_harness_config::read_env_nonempty;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Environment keys read by the system-test helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Directory that receives per-test artifacts.
    RunRoot,
    /// Whole-suite budget in seconds.
    TimeoutSeconds,
    /// Leave planted telemetry in the store after a suite.
    KeepTelemetry,
}

impl SystemTestEnv {
    /// Returns the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "ALERT_HARNESS_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "ALERT_HARNESS_SYSTEM_TEST_TIMEOUT_SEC",
            Self::KeepTelemetry => "ALERT_HARNESS_SYSTEM_TEST_KEEP_TELEMETRY",
        }
    }

    fn read(self) -> Result<Option<String>, String> {
        read_env_nonempty(self.as_str()).map_err(describe)
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Suite settings; every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Artifact root; `None` picks a fresh directory under `target/`.
    pub run_root: Option<PathBuf>,
    /// Suite budget overriding the per-suite default.
    pub timeout: Option<Duration>,
    /// Skip truncating the telemetry store when a suite finishes.
    pub keep_telemetry: bool,
}

impl SystemTestConfig {
    /// Reads the suite settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable when a value is empty, not
    /// UTF-8, a zero or non-numeric timeout, or an unknown boolean.
    pub fn load() -> Result<Self, String> {
        let run_root = SystemTestEnv::RunRoot.read()?.map(PathBuf::from);
        let timeout = match SystemTestEnv::TimeoutSeconds.read()? {
            Some(raw) => Some(
                parse_timeout_seconds(SystemTestEnv::TimeoutSeconds.as_str(), &raw)
                    .map_err(describe)?,
            ),
            None => None,
        };
        let keep_telemetry = match SystemTestEnv::KeepTelemetry.read()? {
            Some(raw) => {
                parse_bool(SystemTestEnv::KeepTelemetry.as_str(), &raw).map_err(describe)?
            }
            None => false,
        };
        Ok(Self {
            run_root,
            timeout,
            keep_telemetry,
        })
    }
}

fn describe(err: ConfigError) -> String {
    err.to_string()
}
