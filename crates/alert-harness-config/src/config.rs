// crates/alert-harness-config/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Config model, file loading, env overrides, and validation.
// Purpose: Give every harness component one typed, validated view of settings.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! [`HarnessConfig`] groups lifecycle flags, endpoint URLs, telemetry-store
//! credentials, admin credentials, request timeouts, and the images of the
//! container stack started for collaborators that have no endpoint.
//!
//! Invariants:
//! - Environment variables always win over file values.
//! - Every configured URL parses and uses `http` or `https`.
//! - The request timeout is between one second and ten minutes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::env::HarnessEnv;
use crate::env::parse_bool;
use crate::env::parse_timeout_seconds;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Maximum size of a config file in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Upper bound for the per-request timeout.
const MAX_REQUEST_TIMEOUT_SEC: u64 = 600;
/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
/// Default resource cache location.
const DEFAULT_CACHE_PATH: &str = "target/alert-harness/cache.json";
/// Default admin email registered on a fresh system under test.
const DEFAULT_ADMIN_EMAIL: &str = "admin@integration.test";
/// Default admin password registered on a fresh system under test.
const DEFAULT_ADMIN_PASSWORD: &str = "password123Z$";
/// Default telemetry store user.
const DEFAULT_STORE_USER: &str = "default";
/// Default telemetry store database holding metric tables.
const DEFAULT_STORE_DATABASE: &str = "signoz_metrics";
/// Default container network name.
const DEFAULT_NETWORK: &str = "alert-harness";
/// Default coordination service image.
const DEFAULT_ZOOKEEPER_IMAGE: &str = "bitnami/zookeeper:3.7.1";
/// Default telemetry store image.
const DEFAULT_CLICKHOUSE_IMAGE: &str = "clickhouse/clickhouse-server:25.5.6";
/// Default schema migrator image.
const DEFAULT_MIGRATOR_IMAGE: &str = "signoz/signoz-schema-migrator:v0.129.7";
/// Default mock receiver image.
const DEFAULT_MOCK_RECEIVER_IMAGE: &str = "wiremock/wiremock:3.13.1";
/// Default system under test image.
const DEFAULT_SUT_IMAGE: &str = "signoz/signoz:v0.96.1";
/// Default HTTP port of the system under test.
const DEFAULT_SUT_PORT: u16 = 8080;

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Fixture lifecycle settings.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Endpoints of externally managed collaborators.
    #[serde(default)]
    pub endpoints: EndpointConfig,
    /// Telemetry store credentials.
    #[serde(default)]
    pub telemetry_store: TelemetryStoreConfig,
    /// Admin account used to obtain bearer tokens.
    #[serde(default)]
    pub admin: AdminConfig,
    /// HTTP timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Container images for collaborators started by the harness.
    #[serde(default)]
    pub stack: StackConfig,
}

/// Reuse and teardown-only flags plus the cache location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Keep resources alive across runs.
    #[serde(default)]
    pub reuse: bool,
    /// Only tear down resources recorded in the cache.
    #[serde(default)]
    pub teardown_only: bool,
    /// Cache file recording reusable resources.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            reuse: false,
            teardown_only: false,
            cache_path: default_cache_path(),
        }
    }
}

/// URLs of collaborators that are already running. Unset entries are started
/// by the harness.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Base URL of the system under test.
    #[serde(default)]
    pub sut_url: Option<String>,
    /// Mock receiver URL reachable from the test runner.
    #[serde(default)]
    pub mock_host_url: Option<String>,
    /// Mock receiver URL reachable from inside the container network.
    #[serde(default)]
    pub mock_container_url: Option<String>,
    /// HTTP interface of the telemetry store.
    #[serde(default)]
    pub telemetry_store_url: Option<String>,
}

impl EndpointConfig {
    /// Returns the container-side mock URL, falling back to the host URL.
    #[must_use]
    pub fn mock_container_url(&self) -> Option<&str> {
        self.mock_container_url.as_deref().or(self.mock_host_url.as_deref())
    }
}

/// Telemetry store credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryStoreConfig {
    /// Store user.
    #[serde(default = "default_store_user")]
    pub user: String,
    /// Store password.
    #[serde(default)]
    pub password: String,
    /// Database holding the metric tables.
    #[serde(default = "default_store_database")]
    pub database: String,
}

impl Default for TelemetryStoreConfig {
    fn default() -> Self {
        Self {
            user: default_store_user(),
            password: String::new(),
            database: default_store_database(),
        }
    }
}

/// Admin credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Admin email.
    #[serde(default = "default_admin_email")]
    pub email: String,
    /// Admin password.
    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            password: default_admin_password(),
        }
    }
}

/// HTTP timeout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_sec: default_request_timeout_sec(),
        }
    }
}

/// Images and settings of the container stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Network every container joins.
    #[serde(default = "default_network")]
    pub network: String,
    /// Coordination service image (`repository:tag`).
    #[serde(default = "default_zookeeper_image")]
    pub zookeeper_image: String,
    /// Telemetry store image.
    #[serde(default = "default_clickhouse_image")]
    pub clickhouse_image: String,
    /// One-shot schema migrator image.
    #[serde(default = "default_migrator_image")]
    pub migrator_image: String,
    /// Mock receiver image.
    #[serde(default = "default_mock_receiver_image")]
    pub mock_receiver_image: String,
    /// System under test image.
    #[serde(default = "default_sut_image")]
    pub sut_image: String,
    /// HTTP port the system under test listens on.
    #[serde(default = "default_sut_port")]
    pub sut_port: u16,
    /// Extra environment for the system under test.
    #[serde(default)]
    pub sut_env: BTreeMap<String, String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            zookeeper_image: default_zookeeper_image(),
            clickhouse_image: default_clickhouse_image(),
            migrator_image: default_migrator_image(),
            mock_receiver_image: default_mock_receiver_image(),
            sut_image: default_sut_image(),
            sut_port: DEFAULT_SUT_PORT,
            sut_env: BTreeMap::new(),
        }
    }
}

impl StackConfig {
    /// Splits an image reference into repository and tag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the reference has no tag.
    pub fn split_image<'a>(
        field: &str,
        reference: &'a str,
    ) -> Result<(&'a str, &'a str), ConfigError> {
        let Some((repository, tag)) = reference.rsplit_once(':') else {
            return Err(ConfigError::Invalid(format!("{field} must be repository:tag")));
        };
        if repository.is_empty() || tag.is_empty() || tag.contains('/') {
            return Err(ConfigError::Invalid(format!("{field} must be repository:tag")));
        }
        Ok((repository, tag))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.network.trim().is_empty() {
            return Err(ConfigError::Invalid("stack.network must not be empty".to_string()));
        }
        let images = [
            ("stack.zookeeper_image", &self.zookeeper_image),
            ("stack.clickhouse_image", &self.clickhouse_image),
            ("stack.migrator_image", &self.migrator_image),
            ("stack.mock_receiver_image", &self.mock_receiver_image),
            ("stack.sut_image", &self.sut_image),
        ];
        for (field, image) in images {
            Self::split_image(field, image)?;
        }
        if self.sut_port == 0 {
            return Err(ConfigError::Invalid("stack.sut_port must not be zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads the config file (when one is given or named by
    /// `ALERT_HARNESS_CONFIG`), applies env overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// environment value is malformed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without applying env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path or file content is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses TOML text without applying env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Overrides file values with `ALERT_HARNESS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is empty, not UTF-8,
    /// or not parseable for its field.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(raw) = HarnessEnv::Reuse.read()? {
            self.lifecycle.reuse = parse_bool(HarnessEnv::Reuse.as_str(), &raw)?;
        }
        if let Some(raw) = HarnessEnv::Teardown.read()? {
            self.lifecycle.teardown_only = parse_bool(HarnessEnv::Teardown.as_str(), &raw)?;
        }
        if let Some(raw) = HarnessEnv::CachePath.read()? {
            self.lifecycle.cache_path = PathBuf::from(raw);
        }
        override_opt(&mut self.endpoints.sut_url, HarnessEnv::SutUrl)?;
        override_opt(&mut self.endpoints.mock_host_url, HarnessEnv::MockHostUrl)?;
        override_opt(&mut self.endpoints.mock_container_url, HarnessEnv::MockContainerUrl)?;
        override_opt(&mut self.endpoints.telemetry_store_url, HarnessEnv::TelemetryStoreUrl)?;
        if let Some(user) = HarnessEnv::TelemetryStoreUser.read()? {
            self.telemetry_store.user = user;
        }
        if let Some(password) = HarnessEnv::TelemetryStorePassword.read()? {
            self.telemetry_store.password = password;
        }
        if let Some(email) = HarnessEnv::AdminEmail.read()? {
            self.admin.email = email;
        }
        if let Some(password) = HarnessEnv::AdminPassword.read()? {
            self.admin.password = password;
        }
        if let Some(raw) = HarnessEnv::TimeoutSeconds.read()? {
            let timeout = parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &raw)?;
            self.timeouts.request_timeout_sec = timeout.as_secs();
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("lifecycle.cache_path must not be empty".to_string()));
        }
        validate_path(&self.lifecycle.cache_path)?;
        let urls = [
            ("endpoints.sut_url", &self.endpoints.sut_url),
            ("endpoints.mock_host_url", &self.endpoints.mock_host_url),
            ("endpoints.mock_container_url", &self.endpoints.mock_container_url),
            ("endpoints.telemetry_store_url", &self.endpoints.telemetry_store_url),
        ];
        for (field, value) in urls {
            if let Some(value) = value {
                validate_http_url(field, value)?;
            }
        }
        if self.endpoints.mock_container_url.is_some() && self.endpoints.mock_host_url.is_none() {
            return Err(ConfigError::Invalid(
                "endpoints.mock_container_url requires endpoints.mock_host_url".to_string(),
            ));
        }
        if self.admin.email.trim().is_empty() || !self.admin.email.contains('@') {
            return Err(ConfigError::Invalid("admin.email must be an email address".to_string()));
        }
        if self.admin.password.is_empty() {
            return Err(ConfigError::Invalid("admin.password must not be empty".to_string()));
        }
        if self.telemetry_store.user.trim().is_empty() {
            return Err(ConfigError::Invalid("telemetry_store.user must not be empty".to_string()));
        }
        if self.telemetry_store.database.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "telemetry_store.database must not be empty".to_string(),
            ));
        }
        let timeout = self.timeouts.request_timeout_sec;
        if timeout == 0 || timeout > MAX_REQUEST_TIMEOUT_SEC {
            return Err(ConfigError::Invalid(format!(
                "timeouts.request_timeout_sec must be between 1 and {MAX_REQUEST_TIMEOUT_SEC}"
            )));
        }
        self.stack.validate()
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_timeout_sec)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for classification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument or the environment.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = HarnessEnv::ConfigPath.read()? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    Ok(None)
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Rejects URLs that do not parse or use a non-HTTP scheme.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed =
        Url::parse(value).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!("{field}: unsupported scheme {other}"))),
    }
}

/// Replaces an optional field when its env var is set.
fn override_opt(slot: &mut Option<String>, key: HarnessEnv) -> Result<(), ConfigError> {
    if let Some(value) = key.read()? {
        *slot = Some(value);
    }
    Ok(())
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

fn default_store_user() -> String {
    DEFAULT_STORE_USER.to_string()
}

fn default_store_database() -> String {
    DEFAULT_STORE_DATABASE.to_string()
}

fn default_admin_email() -> String {
    DEFAULT_ADMIN_EMAIL.to_string()
}

fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

const fn default_request_timeout_sec() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SEC
}

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

fn default_zookeeper_image() -> String {
    DEFAULT_ZOOKEEPER_IMAGE.to_string()
}

fn default_clickhouse_image() -> String {
    DEFAULT_CLICKHOUSE_IMAGE.to_string()
}

fn default_migrator_image() -> String {
    DEFAULT_MIGRATOR_IMAGE.to_string()
}

fn default_mock_receiver_image() -> String {
    DEFAULT_MOCK_RECEIVER_IMAGE.to_string()
}

fn default_sut_image() -> String {
    DEFAULT_SUT_IMAGE.to_string()
}

const fn default_sut_port() -> u16 {
    DEFAULT_SUT_PORT
}
