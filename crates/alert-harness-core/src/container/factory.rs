// crates/alert-harness-core/src/container/factory.rs
// ============================================================================
// Module: Container Factories
// Description: Resource factories for containers and networks.
// Purpose: Plug container runtimes into the fixture lifecycle.
// Dependencies: async-trait
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use super::ContainerHandle;
use super::ContainerRuntime;
use super::ContainerSpec;
use super::NetworkHandle;
use crate::error::HarnessError;
use crate::error::Result;
use crate::fixture::ResourceFactory;

// ============================================================================
// SECTION: Containers
// ============================================================================

/// Starts one container from a fixed spec.
pub struct ContainerFactory {
    /// Runtime used for start and remove.
    runtime: Arc<dyn ContainerRuntime>,
    /// Container to start.
    spec: ContainerSpec,
}

impl ContainerFactory {
    /// Binds a spec to a runtime.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, spec: ContainerSpec) -> Self {
        Self {
            runtime,
            spec,
        }
    }
}

#[async_trait]
impl ResourceFactory for ContainerFactory {
    type Descriptor = ContainerHandle;
    type Resource = ContainerHandle;

    fn empty(&self) -> ContainerHandle {
        ContainerHandle {
            name: self.spec.name.clone(),
            ..ContainerHandle::default()
        }
    }

    async fn create(&self) -> Result<ContainerHandle> {
        self.runtime.start(&self.spec).await
    }

    async fn delete(&self, resource: ContainerHandle) -> Result<()> {
        if resource.is_placeholder() {
            return Ok(());
        }
        self.runtime.remove(&resource).await
    }

    async fn restore(&self, descriptor: ContainerHandle) -> Result<ContainerHandle> {
        if descriptor.is_placeholder() {
            return Err(HarnessError::SetupFatal(format!(
                "cached container {} has no id",
                descriptor.name
            )));
        }
        Ok(descriptor)
    }

    fn describe(&self, resource: &ContainerHandle) -> ContainerHandle {
        resource.clone()
    }
}

// ============================================================================
// SECTION: Networks
// ============================================================================

/// Creates one named network.
pub struct NetworkFactory {
    /// Runtime used for create and remove.
    runtime: Arc<dyn ContainerRuntime>,
    /// Network name.
    name: String,
}

impl NetworkFactory {
    /// Binds a network name to a runtime.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, name: impl Into<String>) -> Self {
        Self {
            runtime,
            name: name.into(),
        }
    }
}

#[async_trait]
impl ResourceFactory for NetworkFactory {
    type Descriptor = NetworkHandle;
    type Resource = NetworkHandle;

    fn empty(&self) -> NetworkHandle {
        NetworkHandle {
            id: String::new(),
            name: self.name.clone(),
        }
    }

    async fn create(&self) -> Result<NetworkHandle> {
        self.runtime.create_network(&self.name).await
    }

    async fn delete(&self, resource: NetworkHandle) -> Result<()> {
        if resource.id.is_empty() {
            return Ok(());
        }
        self.runtime.remove_network(&resource).await
    }

    async fn restore(&self, descriptor: NetworkHandle) -> Result<NetworkHandle> {
        Ok(descriptor)
    }

    fn describe(&self, resource: &NetworkHandle) -> NetworkHandle {
        resource.clone()
    }
}
