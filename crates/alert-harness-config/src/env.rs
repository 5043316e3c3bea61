// crates/alert-harness-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment variable names and strict parsers.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty strings, and unrecognized booleans
//! fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::config::ConfigError;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys understood by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Path to a TOML config file.
    ConfigPath,
    /// Keep resources alive across runs (`true`/`false` or `1`/`0`).
    Reuse,
    /// Only tear down cached resources (`true`/`false` or `1`/`0`).
    Teardown,
    /// Location of the resource cache file.
    CachePath,
    /// Base URL of an already running system under test.
    SutUrl,
    /// Mock receiver URL as seen from the test runner.
    MockHostUrl,
    /// Mock receiver URL as seen from the container network.
    MockContainerUrl,
    /// HTTP interface of the telemetry store.
    TelemetryStoreUrl,
    /// Telemetry store user.
    TelemetryStoreUser,
    /// Telemetry store password.
    TelemetryStorePassword,
    /// Admin account email.
    AdminEmail,
    /// Admin account password.
    AdminPassword,
    /// Per-request timeout in seconds (positive integer).
    TimeoutSeconds,
}

impl HarnessEnv {
    /// Every key, in a stable order.
    pub const ALL: [Self; 13] = [
        Self::ConfigPath,
        Self::Reuse,
        Self::Teardown,
        Self::CachePath,
        Self::SutUrl,
        Self::MockHostUrl,
        Self::MockContainerUrl,
        Self::TelemetryStoreUrl,
        Self::TelemetryStoreUser,
        Self::TelemetryStorePassword,
        Self::AdminEmail,
        Self::AdminPassword,
        Self::TimeoutSeconds,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "ALERT_HARNESS_CONFIG",
            Self::Reuse => "ALERT_HARNESS_REUSE",
            Self::Teardown => "ALERT_HARNESS_TEARDOWN",
            Self::CachePath => "ALERT_HARNESS_CACHE_PATH",
            Self::SutUrl => "ALERT_HARNESS_SUT_URL",
            Self::MockHostUrl => "ALERT_HARNESS_MOCK_HOST_URL",
            Self::MockContainerUrl => "ALERT_HARNESS_MOCK_CONTAINER_URL",
            Self::TelemetryStoreUrl => "ALERT_HARNESS_TELEMETRY_STORE_URL",
            Self::TelemetryStoreUser => "ALERT_HARNESS_TELEMETRY_STORE_USER",
            Self::TelemetryStorePassword => "ALERT_HARNESS_TELEMETRY_STORE_PASSWORD",
            Self::AdminEmail => "ALERT_HARNESS_ADMIN_EMAIL",
            Self::AdminPassword => "ALERT_HARNESS_ADMIN_PASSWORD",
            Self::TimeoutSeconds => "ALERT_HARNESS_TIMEOUT_SEC",
        }
    }

    /// Reads this key, rejecting empty and non-UTF-8 values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is empty or not UTF-8.
    pub fn read(self) -> Result<Option<String>, ConfigError> {
        read_env_nonempty(self.as_str())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value is empty or not UTF-8.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive whole number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for non-numeric or zero values.
pub fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses `1`, `0`, `true`, or `false` (case-insensitive).
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for any other literal.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(ConfigError::Invalid(format!("{name} must be 1, 0, true, or false")))
}
