// crates/alert-harness-core/src/container/docker_cli.rs
// ============================================================================
// Module: Docker CLI Runtime
// Description: Detached containers and networks driven through the docker CLI.
// Purpose: Keep dependencies alive after the harness process exits.
// Dependencies: tokio::process, tracing
// ============================================================================

//! ## Overview
//! Every operation shells out to `docker`. Containers are started with
//! `docker run -d` and published on loopback with an ephemeral host port,
//! which `docker port` then resolves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::ContainerHandle;
use super::ContainerRuntime;
use super::ContainerSpec;
use super::NetworkHandle;
use super::UrlConfig;
use crate::error::HarnessError;
use crate::error::Result;

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Docker CLI backed runtime.
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Path or name of the docker binary.
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }
}

impl DockerCli {
    /// Uses a specific docker-compatible binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs the binary and returns trimmed stdout, or stderr as the error.
    async fn exec(&self, args: &[String]) -> std::result::Result<String, String> {
        debug!(binary = %self.binary, args = %args.join(" "), "docker command");
        let verb = args.first().map_or("", String::as_str);
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|err| format!("{} {verb}: {err}", self.binary))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} {verb} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Resolves the loopback host port published for `port`.
    async fn published_port(&self, id: &str, port: u16) -> Result<u16> {
        let out = self
            .exec(&owned(&["port", id, &format!("{port}/tcp")]))
            .await
            .map_err(HarnessError::SetupFatal)?;
        parse_published_port(&out).ok_or_else(|| {
            HarnessError::SetupFatal(format!("no published host port for {id}:{port} in '{out}'"))
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn create_network(&self, name: &str) -> Result<NetworkHandle> {
        let id = self
            .exec(&owned(&["network", "create", name]))
            .await
            .map_err(HarnessError::SetupFatal)?;
        Ok(NetworkHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn remove_network(&self, network: &NetworkHandle) -> Result<()> {
        self.exec(&owned(&["network", "rm", &network.name]))
            .await
            .map(drop)
            .map_err(HarnessError::Cleanup)
    }

    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let id = self.exec(&run_args(spec, true)).await.map_err(HarnessError::SetupFatal)?;
        let mut host_configs = BTreeMap::new();
        for port in &spec.exposed_ports {
            let published = self.published_port(&id, *port).await?;
            host_configs
                .insert(port.to_string(), UrlConfig::new(&spec.scheme, "127.0.0.1", published));
        }
        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
            host_configs,
            container_configs: spec.container_configs(),
            env: spec.env.clone(),
        })
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<()> {
        self.exec(&owned(&["rm", "-f", "-v", &handle.id]))
            .await
            .map(drop)
            .map_err(HarnessError::Cleanup)
    }

    async fn run_to_completion(&self, spec: &ContainerSpec) -> Result<String> {
        self.exec(&run_args(spec, false)).await.map_err(HarnessError::SetupFatal)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails when the docker daemon is unreachable.
///
/// # Errors
///
/// Returns [`HarnessError::SetupFatal`] with the CLI output on failure.
pub async fn ensure_docker_available() -> Result<()> {
    DockerCli::default()
        .exec(&owned(&["info", "--format", "{{.ServerVersion}}"]))
        .await
        .map(drop)
        .map_err(|err| HarnessError::SetupFatal(format!("docker unavailable: {err}")))
}

/// Builds `docker run` arguments; detached runs publish ports, one-shot runs
/// are removed on exit.
fn run_args(spec: &ContainerSpec, detached: bool) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if detached {
        args.push("-d".to_string());
    } else {
        args.push("--rm".to_string());
    }
    args.push("--name".to_string());
    args.push(spec.name.clone());
    if let Some(network) = &spec.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    if detached {
        for port in &spec.exposed_ports {
            args.push("-p".to_string());
            args.push(format!("127.0.0.1::{port}"));
        }
    }
    args.push(spec.reference());
    args.extend(spec.cmd.iter().cloned());
    args
}

/// Parses `docker port` output such as `127.0.0.1:49153`.
fn parse_published_port(out: &str) -> Option<u16> {
    out.lines().find_map(|line| line.trim().rsplit_once(':')?.1.parse().ok())
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::ContainerSpec;
    use super::parse_published_port;
    use super::run_args;

    #[test]
    fn published_port_takes_first_parseable_line() {
        assert_eq!(parse_published_port("127.0.0.1:49153\n[::1]:49153"), Some(49153));
        assert_eq!(parse_published_port(""), None);
    }

    #[test]
    fn detached_run_publishes_on_loopback() {
        let spec = ContainerSpec::new("wiremock/wiremock", "2.35.1", "mock")
            .with_network("alerts")
            .with_env("A", "1")
            .with_port(8080)
            .with_cmd(["--verbose"]);
        let args = run_args(&spec, true);
        assert_eq!(
            args,
            [
                "run",
                "-d",
                "--name",
                "mock",
                "--network",
                "alerts",
                "-e",
                "A=1",
                "-p",
                "127.0.0.1::8080",
                "wiremock/wiremock:2.35.1",
                "--verbose"
            ]
        );
        let one_shot = run_args(&spec, false);
        assert!(one_shot.contains(&"--rm".to_string()));
        assert!(!one_shot.contains(&"-p".to_string()));
    }
}
