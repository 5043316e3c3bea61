// crates/alert-harness-config/src/env_tests.rs
// ============================================================================
// Module: Harness Env Unit Tests
// Description: Unit coverage for environment overrides.
// Purpose: Ensure env parsing fails closed and wins over file values.
// Dependencies: std, tempfile
// ============================================================================

//! ## Overview
//! Unit coverage for strict environment parsing.
//! Invariants:
//! - Environment parsing rejects invalid or empty values.
//! - Tests restore environment state after each run.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

use super::ConfigError;
use super::HarnessConfig;
use super::HarnessEnv;

mod env_mut {
    #![allow(unsafe_code, reason = "Tests mutate process env vars in a controlled scope.")]

    /// Sets an environment variable for the current process.
    pub fn set_var(key: &str, value: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    /// Removes an environment variable from the current process.
    pub fn remove_var(key: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Snapshots every harness variable, clears them, and restores on drop.
struct EnvGuard {
    entries: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn cleared() -> Self {
        let entries = HarnessEnv::ALL
            .iter()
            .map(|key| (key.as_str(), std::env::var(key.as_str()).ok()))
            .collect();
        for key in HarnessEnv::ALL {
            env_mut::remove_var(key.as_str());
        }
        Self {
            entries,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.entries.drain(..) {
            match value {
                Some(value) => env_mut::set_var(name, &value),
                None => env_mut::remove_var(name),
            }
        }
    }
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    let config = HarnessConfig::load(None).unwrap();
    assert!(!config.lifecycle.reuse);
    assert!(!config.lifecycle.teardown_only);
    assert_eq!(config.lifecycle.cache_path, PathBuf::from("target/alert-harness/cache.json"));
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.admin.email, "admin@integration.test");
    assert!(config.endpoints.sut_url.is_none());
}

#[test]
fn lifecycle_flags_accept_numeric_and_word_literals() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    env_mut::set_var(HarnessEnv::Reuse.as_str(), "1");
    env_mut::set_var(HarnessEnv::Teardown.as_str(), "TRUE");
    let config = HarnessConfig::load(None).unwrap();
    assert!(config.lifecycle.reuse);
    assert!(config.lifecycle.teardown_only);

    env_mut::set_var(HarnessEnv::Reuse.as_str(), "false");
    env_mut::set_var(HarnessEnv::Teardown.as_str(), "0");
    let config = HarnessConfig::load(None).unwrap();
    assert!(!config.lifecycle.reuse);
    assert!(!config.lifecycle.teardown_only);
}

#[test]
fn lifecycle_flag_rejects_unknown_literal() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    env_mut::set_var(HarnessEnv::Reuse.as_str(), "yes");
    let err = HarnessConfig::load(None).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Invalid("ALERT_HARNESS_REUSE must be 1, 0, true, or false".to_string())
    );
}

#[test]
fn empty_values_fail_closed() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    env_mut::set_var(HarnessEnv::SutUrl.as_str(), "   ");
    let err = HarnessConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("ALERT_HARNESS_SUT_URL must not be empty"));
}

#[test]
fn timeout_rejects_zero_and_garbage() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "0");
    let err = HarnessConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("must be greater than zero"));

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "ten");
    let err = HarnessConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("positive integer number of seconds"));

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "12");
    let config = HarnessConfig::load(None).unwrap();
    assert_eq!(config.request_timeout(), Duration::from_secs(12));
}

#[test]
fn env_overrides_file_values() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[endpoints]\nsut_url = \"http://file-host:8080\"\nmock_host_url = \
         \"http://127.0.0.1:9000\"\n\n[lifecycle]\nreuse = true\n"
    )
    .unwrap();
    env_mut::set_var(HarnessEnv::ConfigPath.as_str(), &file.path().to_string_lossy());
    env_mut::set_var(HarnessEnv::SutUrl.as_str(), "http://env-host:8080");
    let config = HarnessConfig::load(None).unwrap();
    assert_eq!(config.endpoints.sut_url.as_deref(), Some("http://env-host:8080"));
    assert_eq!(config.endpoints.mock_container_url(), Some("http://127.0.0.1:9000"));
    assert!(config.lifecycle.reuse);
}

#[test]
fn container_url_without_host_url_is_rejected() {
    let _lock = env_lock();
    let _guard = EnvGuard::cleared();
    env_mut::set_var(HarnessEnv::MockContainerUrl.as_str(), "http://wiremock:8080");
    let err = HarnessConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("requires endpoints.mock_host_url"));
}
