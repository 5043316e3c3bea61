// crates/alert-harness-core/src/container/mod.rs
// ============================================================================
// Module: Container Control
// Description: Container and network handles plus the runtime seam.
// Purpose: Start external dependencies and describe how to reach them.
// Dependencies: async-trait, serde, testcontainers
// ============================================================================

//! ## Overview
//! A [`ContainerRuntime`] turns a [`ContainerSpec`] into a running
//! [`ContainerHandle`]. Each handle carries two URL maps keyed by container
//! port: `host_configs` (reachable from the test runner) and
//! `container_configs` (reachable from other containers on the same network).
//!
//! Two runtimes exist. [`TestcontainersRuntime`] ties containers to the
//! current process. [`DockerCli`] starts detached containers that outlive the
//! process, which reuse and teardown-only runs require; [`runtime_for`] picks
//! between them.
//!
//! Invariants:
//! - Both URL maps of a handle have the same keys.
//! - Host entries never name the container; container entries never name the host.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod docker_cli;
mod ephemeral;
mod factory;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::error::HarnessError;
use crate::error::Result;
use crate::fixture::LifecycleFlags;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::docker_cli::DockerCli;
pub use self::docker_cli::ensure_docker_available;
pub use self::ephemeral::TestcontainersRuntime;
pub use self::factory::ContainerFactory;
pub use self::factory::NetworkFactory;

// ============================================================================
// SECTION: Addresses
// ============================================================================

/// Scheme, address, and port of one exposed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlConfig {
    /// URL scheme (`http`, `tcp`).
    pub scheme: String,
    /// Host name or IP.
    pub address: String,
    /// Port number.
    pub port: u16,
}

impl UrlConfig {
    /// Builds an endpoint description.
    #[must_use]
    pub fn new(scheme: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            address: address.into(),
            port,
        }
    }

    /// Returns `scheme://address:port`.
    #[must_use]
    pub fn base(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.address, self.port)
    }

    /// Returns the base URL joined with `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base())
        } else {
            format!("{}/{path}", self.base())
        }
    }
}

// ============================================================================
// SECTION: Handles
// ============================================================================

/// A running container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Runtime-assigned container id.
    pub id: String,
    /// Container name; doubles as its DNS name on the network.
    pub name: String,
    /// Endpoints as seen from the test runner, keyed by container port.
    pub host_configs: BTreeMap<String, UrlConfig>,
    /// Endpoints as seen from the container network, keyed by container port.
    pub container_configs: BTreeMap<String, UrlConfig>,
    /// Environment the container was started with.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ContainerHandle {
    /// Returns true for the placeholder produced in teardown-only runs.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty()
    }

    /// Returns the runner-side endpoint for `port`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] when the port was not exposed.
    pub fn host(&self, port: u16) -> Result<&UrlConfig> {
        lookup(&self.host_configs, &self.name, port, "host")
    }

    /// Returns the network-side endpoint for `port`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] when the port was not exposed.
    pub fn container(&self, port: u16) -> Result<&UrlConfig> {
        lookup(&self.container_configs, &self.name, port, "container")
    }
}

/// A container network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHandle {
    /// Runtime-assigned network id.
    pub id: String,
    /// Network name.
    pub name: String,
}

// ============================================================================
// SECTION: Specs
// ============================================================================

/// What to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image repository.
    pub image: String,
    /// Image tag.
    pub tag: String,
    /// Container name.
    pub name: String,
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// Command override; empty keeps the image default.
    pub cmd: Vec<String>,
    /// Container ports to publish.
    pub exposed_ports: Vec<u16>,
    /// Network to join.
    pub network: Option<String>,
    /// Scheme recorded in the URL maps.
    pub scheme: String,
}

impl ContainerSpec {
    /// Starts a spec for `image:tag` named `name`.
    #[must_use]
    pub fn new(image: impl Into<String>, tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: tag.into(),
            name: name.into(),
            env: BTreeMap::new(),
            cmd: Vec::new(),
            exposed_ports: Vec::new(),
            network: None,
            scheme: "http".to_string(),
        }
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Publishes a container port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.exposed_ports.push(port);
        self
    }

    /// Joins a network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Overrides the command.
    #[must_use]
    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the URL scheme recorded for exposed ports.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Returns `image:tag`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Builds the network-side URL map: the container name and the raw port.
    #[must_use]
    pub fn container_configs(&self) -> BTreeMap<String, UrlConfig> {
        self.exposed_ports
            .iter()
            .map(|port| (port.to_string(), UrlConfig::new(&self.scheme, &self.name, *port)))
            .collect()
    }
}

// ============================================================================
// SECTION: Runtime Seam
// ============================================================================

/// Starts and stops containers and networks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates a network.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the network cannot be created.
    async fn create_network(&self, name: &str) -> Result<NetworkHandle>;

    /// Removes a network.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Cleanup`] when removal fails.
    async fn remove_network(&self, network: &NetworkHandle) -> Result<()>;

    /// Starts a long-running container.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the container does not start.
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;

    /// Stops and removes a container with its volumes.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Cleanup`] when removal fails.
    async fn remove(&self, handle: &ContainerHandle) -> Result<()>;

    /// Runs a one-shot container (for example a schema migrator) and returns
    /// its stdout once it exits successfully.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the container exits non-zero.
    async fn run_to_completion(&self, spec: &ContainerSpec) -> Result<String>;
}

/// Picks the runtime matching the lifecycle flags: detached containers when
/// they must outlive the process, process-scoped containers otherwise.
#[must_use]
pub fn runtime_for(flags: LifecycleFlags) -> Arc<dyn ContainerRuntime> {
    if flags.persistent() {
        Arc::new(DockerCli::default())
    } else {
        Arc::new(TestcontainersRuntime::default())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn lookup<'a>(
    configs: &'a BTreeMap<String, UrlConfig>,
    name: &str,
    port: u16,
    side: &str,
) -> Result<&'a UrlConfig> {
    configs.get(&port.to_string()).ok_or_else(|| {
        HarnessError::InvalidInput(format!("container {name} has no {side} config for port {port}"))
    })
}
