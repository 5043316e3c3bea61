// crates/alert-harness-core/src/container/ephemeral.rs
// ============================================================================
// Module: Testcontainers Runtime
// Description: Process-scoped containers started through testcontainers.
// Purpose: Default runtime when nothing has to survive the harness process.
// Dependencies: testcontainers, tokio
// ============================================================================

//! ## Overview
//! Containers started here are owned by the runtime and removed when
//! [`ContainerRuntime::remove`] runs or the runtime is dropped. Networks and
//! one-shot containers go through [`DockerCli`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::ImageExt;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use tracing::debug;

use super::ContainerHandle;
use super::ContainerRuntime;
use super::ContainerSpec;
use super::DockerCli;
use super::NetworkHandle;
use super::UrlConfig;
use crate::error::HarnessError;
use crate::error::Result;

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// testcontainers-backed runtime.
#[derive(Default)]
pub struct TestcontainersRuntime {
    /// Live containers keyed by id.
    containers: Mutex<HashMap<String, ContainerAsync<GenericImage>>>,
    /// Network and one-shot operations.
    cli: DockerCli,
}

impl TestcontainersRuntime {
    fn take(&self, id: &str) -> Result<Option<ContainerAsync<GenericImage>>> {
        let mut containers = self
            .containers
            .lock()
            .map_err(|_| HarnessError::Cleanup("container registry lock poisoned".to_string()))?;
        Ok(containers.remove(id))
    }
}

#[async_trait]
impl ContainerRuntime for TestcontainersRuntime {
    async fn create_network(&self, name: &str) -> Result<NetworkHandle> {
        self.cli.create_network(name).await
    }

    async fn remove_network(&self, network: &NetworkHandle) -> Result<()> {
        self.cli.remove_network(network).await
    }

    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let mut image = GenericImage::new(spec.image.clone(), spec.tag.clone());
        for port in &spec.exposed_ports {
            image = image.with_exposed_port(port.tcp());
        }
        let mut request = image.with_container_name(spec.name.clone());
        for (key, value) in &spec.env {
            request = request.with_env_var(key.clone(), value.clone());
        }
        if let Some(network) = &spec.network {
            request = request.with_network(network.clone());
        }
        if !spec.cmd.is_empty() {
            request = request.with_cmd(spec.cmd.clone());
        }
        let container = request.start().await.map_err(|err| {
            HarnessError::SetupFatal(format!("failed to start {}: {err}", spec.reference()))
        })?;
        let host = container
            .get_host()
            .await
            .map_err(|err| HarnessError::SetupFatal(format!("host lookup failed: {err}")))?
            .to_string();
        let mut host_configs = BTreeMap::new();
        for port in &spec.exposed_ports {
            let published = container.get_host_port_ipv4(port.tcp()).await.map_err(|err| {
                HarnessError::SetupFatal(format!("port {port} of {} not mapped: {err}", spec.name))
            })?;
            host_configs.insert(port.to_string(), UrlConfig::new(&spec.scheme, &host, published));
        }
        let id = container.id().to_string();
        debug!(id = %id, name = %spec.name, "container started");
        self.containers
            .lock()
            .map_err(|_| HarnessError::SetupFatal("container registry lock poisoned".to_string()))?
            .insert(id.clone(), container);
        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
            host_configs,
            container_configs: spec.container_configs(),
            env: spec.env.clone(),
        })
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<()> {
        match self.take(&handle.id)? {
            Some(container) => container
                .rm()
                .await
                .map_err(|err| HarnessError::Cleanup(format!("remove {}: {err}", handle.name))),
            None => self.cli.remove(handle).await,
        }
    }

    async fn run_to_completion(&self, spec: &ContainerSpec) -> Result<String> {
        self.cli.run_to_completion(spec).await
    }
}
