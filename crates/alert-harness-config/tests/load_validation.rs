//! Config load validation tests for alert-harness-config.
// crates/alert-harness-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config file guards (path, size, encoding, schema).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use alert_harness_config::ConfigError;
use alert_harness_config::HarnessConfig;
use alert_harness_config::StackConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<HarnessConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn validated(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config = HarnessConfig::from_toml_str(content)?;
    config.validate()?;
    Ok(config)
}

#[test]
fn from_file_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(
        HarnessConfig::from_file(Path::new(&long_component)),
        "config path component too long",
    )
}

#[test]
fn from_file_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(HarnessConfig::from_file(file.path()), "config file exceeds size limit")
}

#[test]
fn from_file_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(HarnessConfig::from_file(file.path()), "config file must be utf-8")
}

#[test]
fn from_file_reports_missing_file_as_io() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match HarnessConfig::from_file(&dir.path().join("absent.toml")) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(other) => Err(format!("expected io error, got {other}")),
        Ok(_) => Err("expected missing file to fail".to_string()),
    }
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    assert_invalid(validated("[lifecycle]\nreuse = true\nkeep = true\n"), "unknown field")
}

#[test]
fn non_http_urls_are_rejected() -> TestResult {
    assert_invalid(
        validated("[endpoints]\nsut_url = \"ftp://sut:21\"\n"),
        "unsupported scheme ftp",
    )?;
    assert_invalid(validated("[endpoints]\nsut_url = \"not a url\"\n"), "endpoints.sut_url")
}

#[test]
fn timeout_bounds_are_enforced() -> TestResult {
    assert_invalid(
        validated("[timeouts]\nrequest_timeout_sec = 0\n"),
        "request_timeout_sec must be between 1 and 600",
    )?;
    assert_invalid(
        validated("[timeouts]\nrequest_timeout_sec = 601\n"),
        "request_timeout_sec must be between 1 and 600",
    )
}

#[test]
fn admin_email_must_look_like_an_address() -> TestResult {
    assert_invalid(validated("[admin]\nemail = \"admin\"\n"), "admin.email")
}

#[test]
fn full_file_round_trips_into_typed_fields() -> TestResult {
    let config = validated(
        r#"
[lifecycle]
reuse = true
cache_path = "/tmp/alert-cache.json"

[endpoints]
sut_url = "http://127.0.0.1:8080"
mock_host_url = "http://127.0.0.1:9090"
mock_container_url = "http://wiremock:8080"
telemetry_store_url = "http://127.0.0.1:8123"

[telemetry_store]
user = "ingest"
password = "secret"

[timeouts]
request_timeout_sec = 5
"#,
    )
    .map_err(|err| err.to_string())?;
    if !config.lifecycle.reuse || config.lifecycle.teardown_only {
        return Err("lifecycle flags not parsed".to_string());
    }
    if config.endpoints.mock_container_url() != Some("http://wiremock:8080") {
        return Err("container url not preferred over host url".to_string());
    }
    if config.telemetry_store.database != "signoz_metrics" {
        return Err("store database default missing".to_string());
    }
    if config.request_timeout().as_secs() != 5 {
        return Err("timeout not parsed".to_string());
    }
    Ok(())
}

#[test]
fn stack_defaults_are_valid_images() -> TestResult {
    let config = validated("").map_err(|err| err.to_string())?;
    let (repository, tag) = StackConfig::split_image("stack.sut_image", &config.stack.sut_image)
        .map_err(|err| err.to_string())?;
    if repository.is_empty() || tag.is_empty() {
        return Err("default sut image has no tag".to_string());
    }
    if config.stack.network != "alert-harness" || config.stack.sut_port != 8080 {
        return Err("stack defaults missing".to_string());
    }
    Ok(())
}

#[test]
fn stack_images_need_a_tag() -> TestResult {
    let untagged = validated("[stack]\nsut_image = \"registry:5000/signoz\"\n");
    assert_invalid(untagged, "stack.sut_image")?;
    assert_invalid(validated("[stack]\nmigrator_image = \"migrator\"\n"), "stack.migrator_image")
}

#[test]
fn stack_sut_env_is_read() -> TestResult {
    let config = validated(
        r#"
[stack]
sut_port = 8081

[stack.sut_env]
SIGNOZ_ALERTMANAGER_SIGNOZ_POLL__INTERVAL = "5s"
"#,
    )
    .map_err(|err| err.to_string())?;
    if config.stack.sut_port != 8081 {
        return Err("sut port not parsed".to_string());
    }
    match config.stack.sut_env.get("SIGNOZ_ALERTMANAGER_SIGNOZ_POLL__INTERVAL") {
        Some(value) if value == "5s" => Ok(()),
        _ => Err("sut env not parsed".to_string()),
    }
}
