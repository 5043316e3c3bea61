// crates/alert-harness-core/src/environment.rs
// ============================================================================
// Module: Test Environment
// Description: Container stack provisioning and collaborator wiring.
// Purpose: Turn harness configuration into reachable, ready collaborators.
// Dependencies: alert-harness-config, tokio, tracing
// ============================================================================

//! ## Overview
//! [`TestEnvironment::provision`] resolves every collaborator either from a
//! configured endpoint or by starting it on one container network through a
//! [`FixtureStack`]:
//! network, coordination service, telemetry store (plus its one-shot schema
//! migration), mock receiver, and the system under test.
//!
//! Invariants:
//! - Configured endpoints are never started as containers.
//! - Teardown-only runs start nothing and only release cached resources.
//! - Every started service answers its readiness probe before provisioning
//!   returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use alert_harness_config::HarnessConfig;
use alert_harness_config::StackConfig;
use reqwest::Method;
use tokio::time::Instant;
use tokio::time::sleep;
use tracing::debug;
use tracing::info;

use crate::container::ContainerFactory;
use crate::container::ContainerHandle;
use crate::container::ContainerRuntime;
use crate::container::ContainerSpec;
use crate::container::NetworkFactory;
use crate::container::runtime_for;
use crate::control_plane::ControlPlaneClient;
use crate::error::HarnessError;
use crate::error::Result;
use crate::fixture::FixtureStack;
use crate::fixture::LifecycleFlags;
use crate::fixture::ResourceCache;
use crate::http::ApiClient;
use crate::mock_receiver::MockReceiverClient;
use crate::orchestrator::Orchestrator;
use crate::session::AdminSession;
use crate::telemetry::ClickHouseSink;
use crate::telemetry::TelemetryIngestor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cache key of the container network.
pub const NETWORK_KEY: &str = "network";
/// Cache key of the coordination service.
pub const ZOOKEEPER_KEY: &str = "zookeeper";
/// Cache key of the telemetry store.
pub const CLICKHOUSE_KEY: &str = "clickhouse";
/// Cache key of the mock receiver.
pub const MOCK_RECEIVER_KEY: &str = "wiremock";
/// Cache key of the system under test.
pub const SUT_KEY: &str = "sut";

/// HTTP interface port of the telemetry store.
const CLICKHOUSE_HTTP_PORT: u16 = 8123;
/// Native protocol port of the telemetry store.
const CLICKHOUSE_NATIVE_PORT: u16 = 9000;
/// Client port of the coordination service.
const ZOOKEEPER_PORT: u16 = 2181;
/// HTTP port of the mock receiver.
const MOCK_RECEIVER_PORT: u16 = 8080;
/// Longest wait for a started service to answer.
const READINESS_TIMEOUT: Duration = Duration::from_secs(180);
/// Pause between readiness probes.
const READINESS_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// SECTION: Endpoints
// ============================================================================

/// Where each collaborator is reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    /// System under test, from the runner.
    pub sut_url: String,
    /// Mock receiver, from the runner.
    pub mock_host_url: String,
    /// Mock receiver, from the container network.
    pub mock_container_url: String,
    /// Telemetry store HTTP interface, from the runner.
    pub telemetry_store_url: String,
}

// ============================================================================
// SECTION: Environment
// ============================================================================

/// A provisioned set of collaborators plus the resources backing them.
pub struct TestEnvironment {
    /// Effective configuration.
    config: HarnessConfig,
    /// Acquired resources, released by [`TestEnvironment::teardown`].
    stack: FixtureStack,
    /// Collaborator URLs.
    endpoints: ResolvedEndpoints,
}

impl TestEnvironment {
    /// Resolves or starts every collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when a container, the schema
    /// migration, or a readiness probe fails. Resources acquired before the
    /// failure are released.
    pub async fn provision(config: HarnessConfig) -> Result<Self> {
        let flags = LifecycleFlags::from_config(&config.lifecycle);
        let cache = Arc::new(ResourceCache::new(config.lifecycle.cache_path.clone()));
        let runtime = runtime_for(flags);
        let mut environment = Self {
            config,
            stack: FixtureStack::new(flags, cache),
            endpoints: ResolvedEndpoints::default(),
        };
        if let Err(err) = environment.acquire(&runtime).await {
            environment.teardown().await;
            return Err(err);
        }
        Ok(environment)
    }

    /// Collaborator URLs.
    #[must_use]
    pub const fn endpoints(&self) -> &ResolvedEndpoints {
        &self.endpoints
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Mock receiver admin client.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the HTTP client cannot be built.
    pub fn receiver(&self) -> Result<MockReceiverClient> {
        MockReceiverClient::new(&self.endpoints.mock_host_url, self.config.request_timeout())
    }

    /// Telemetry ingestor bound to the store.
    #[must_use]
    pub fn ingestor(&self) -> TelemetryIngestor {
        let sink = ClickHouseSink::new(
            &self.endpoints.telemetry_store_url,
            &self.config.telemetry_store,
        );
        TelemetryIngestor::new(Arc::new(sink))
    }

    /// Registers the admin if needed and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when registration or login fails.
    pub async fn session(&self) -> Result<AdminSession> {
        AdminSession::bootstrap(
            &self.endpoints.sut_url,
            &self.config.admin.email,
            &self.config.admin.password,
            self.config.request_timeout(),
        )
        .await
    }

    /// Authenticated control plane client.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the session cannot be established.
    pub async fn control_plane(&self) -> Result<ControlPlaneClient> {
        let session = self.session().await?;
        ControlPlaneClient::new(
            &self.endpoints.sut_url,
            &session.access_token,
            self.config.request_timeout(),
        )
    }

    /// Orchestrator wired to this environment's collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when a client cannot be built or the admin
    /// session fails.
    pub async fn orchestrator(&self) -> Result<Orchestrator> {
        let control = self.control_plane().await?;
        let receiver = self.receiver()?;
        Ok(Orchestrator::new(
            Arc::new(control),
            Arc::new(receiver),
            self.ingestor(),
            &self.endpoints.mock_container_url,
        ))
    }

    /// Releases every acquired resource in reverse order.
    pub async fn teardown(&mut self) {
        self.stack.teardown().await;
    }

    async fn acquire(&mut self, runtime: &Arc<dyn ContainerRuntime>) -> Result<()> {
        let teardown_only = self.stack.flags().teardown_only;
        let stack = self.config.stack.clone();
        let endpoints = self.config.endpoints.clone();
        let needs_store = endpoints.telemetry_store_url.is_none() || endpoints.sut_url.is_none();
        let needs_network = needs_store || endpoints.mock_host_url.is_none();

        if needs_network {
            let factory = NetworkFactory::new(Arc::clone(runtime), &stack.network);
            self.stack.wrap(NETWORK_KEY, Arc::new(factory)).await?;
        }

        let mut store_handle = None;
        if needs_store {
            let zookeeper = zookeeper_spec(&stack)?;
            self.start(runtime, ZOOKEEPER_KEY, zookeeper).await?;
            let clickhouse = clickhouse_spec(&stack, &self.config)?;
            let handle = self.start(runtime, CLICKHOUSE_KEY, clickhouse).await?;
            if !teardown_only {
                let url = handle.host(CLICKHOUSE_HTTP_PORT)?.get("ping");
                wait_until_ready(&url, self.config.request_timeout()).await?;
                for mode in ["sync", "async"] {
                    let spec = migrator_spec(&stack, &self.config, mode)?;
                    let output = runtime.run_to_completion(&spec).await?;
                    debug!(mode, output = %output.trim(), "schema migration finished");
                }
            }
            store_handle = Some(handle);
        }
        self.endpoints.telemetry_store_url = match (&endpoints.telemetry_store_url, &store_handle) {
            (Some(url), _) => url.clone(),
            (None, Some(handle)) if !teardown_only => handle.host(CLICKHOUSE_HTTP_PORT)?.base(),
            _ => String::new(),
        };

        if let Some(host_url) = &endpoints.mock_host_url {
            self.endpoints.mock_host_url = host_url.clone();
            self.endpoints.mock_container_url =
                endpoints.mock_container_url().unwrap_or(host_url).to_string();
        } else {
            let spec = mock_receiver_spec(&stack)?;
            let handle = self.start(runtime, MOCK_RECEIVER_KEY, spec).await?;
            if !teardown_only {
                let mock_host = handle.host(MOCK_RECEIVER_PORT)?;
                let health = mock_host.get("__admin/health");
                wait_until_ready(&health, self.config.request_timeout()).await?;
                self.endpoints.mock_host_url = mock_host.base();
                self.endpoints.mock_container_url = handle.container(MOCK_RECEIVER_PORT)?.base();
            }
        }

        if let Some(url) = &endpoints.sut_url {
            self.endpoints.sut_url = url.clone();
        } else {
            let spec = sut_spec(&stack, &self.config)?;
            let handle = self.start(runtime, SUT_KEY, spec).await?;
            if !teardown_only {
                let sut_host = handle.host(stack.sut_port)?;
                let health = sut_host.get("api/v1/health");
                wait_until_ready(&health, self.config.request_timeout()).await?;
                self.endpoints.sut_url = sut_host.base();
            }
        }
        info!(
            sut = %self.endpoints.sut_url,
            mock = %self.endpoints.mock_host_url,
            store = %self.endpoints.telemetry_store_url,
            "environment ready"
        );
        Ok(())
    }

    async fn start(
        &mut self,
        runtime: &Arc<dyn ContainerRuntime>,
        key: &str,
        spec: ContainerSpec,
    ) -> Result<ContainerHandle> {
        let factory = ContainerFactory::new(Arc::clone(runtime), spec);
        self.stack.wrap(key, Arc::new(factory)).await
    }
}

// ============================================================================
// SECTION: Container Specs
// ============================================================================

fn image_spec(field: &str, reference: &str, name: &str, network: &str) -> Result<ContainerSpec> {
    let (repository, tag) = StackConfig::split_image(field, reference)?;
    Ok(ContainerSpec::new(repository, tag, name).with_network(network))
}

fn store_dsn(config: &HarnessConfig) -> String {
    let store = &config.telemetry_store;
    if store.password.is_empty() {
        format!("tcp://{}@{CLICKHOUSE_KEY}:{CLICKHOUSE_NATIVE_PORT}", store.user)
    } else {
        format!(
            "tcp://{}:{}@{CLICKHOUSE_KEY}:{CLICKHOUSE_NATIVE_PORT}",
            store.user, store.password
        )
    }
}

fn zookeeper_spec(stack: &StackConfig) -> Result<ContainerSpec> {
    let spec =
        image_spec("stack.zookeeper_image", &stack.zookeeper_image, ZOOKEEPER_KEY, &stack.network)?;
    Ok(spec
        .with_env("ALLOW_ANONYMOUS_LOGIN", "yes")
        .with_env("ZOO_AUTOPURGE_INTERVAL", "1")
        .with_port(ZOOKEEPER_PORT))
}

fn clickhouse_spec(stack: &StackConfig, config: &HarnessConfig) -> Result<ContainerSpec> {
    let store = &config.telemetry_store;
    let spec = image_spec(
        "stack.clickhouse_image",
        &stack.clickhouse_image,
        CLICKHOUSE_KEY,
        &stack.network,
    )?;
    Ok(spec
        .with_env("CLICKHOUSE_USER", &store.user)
        .with_env("CLICKHOUSE_PASSWORD", &store.password)
        .with_env("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
        .with_port(CLICKHOUSE_HTTP_PORT)
        .with_port(CLICKHOUSE_NATIVE_PORT))
}

fn migrator_spec(stack: &StackConfig, config: &HarnessConfig, mode: &str) -> Result<ContainerSpec> {
    let name = format!("schema-migrator-{mode}");
    let spec = image_spec("stack.migrator_image", &stack.migrator_image, &name, &stack.network)?;
    Ok(spec.with_cmd([
        mode.to_string(),
        format!("--dsn={}", store_dsn(config)),
        "--up=".to_string(),
    ]))
}

fn mock_receiver_spec(stack: &StackConfig) -> Result<ContainerSpec> {
    Ok(image_spec(
        "stack.mock_receiver_image",
        &stack.mock_receiver_image,
        MOCK_RECEIVER_KEY,
        &stack.network,
    )?
    .with_port(MOCK_RECEIVER_PORT))
}

fn sut_spec(stack: &StackConfig, config: &HarnessConfig) -> Result<ContainerSpec> {
    let mut spec = image_spec("stack.sut_image", &stack.sut_image, "signoz", &stack.network)?
        .with_env("SIGNOZ_TELEMETRYSTORE_CLICKHOUSE_DSN", store_dsn(config))
        .with_port(stack.sut_port);
    for (key, value) in &stack.sut_env {
        spec = spec.with_env(key, value);
    }
    Ok(spec)
}

// ============================================================================
// SECTION: Readiness
// ============================================================================

/// Polls `url` with GET until it answers 2xx.
///
/// # Errors
///
/// Returns [`HarnessError::SetupFatal`] when the service is not ready within
/// the readiness timeout.
pub async fn wait_until_ready(url: &str, request_timeout: Duration) -> Result<()> {
    let client = ApiClient::new(url, request_timeout)?;
    let deadline = Instant::now() + READINESS_TIMEOUT;
    loop {
        let last = match client.send_raw(Method::GET, "", &[], None).await {
            Ok(response) if response.is_success() => {
                debug!(url, "service ready");
                return Ok(());
            }
            Ok(response) => format!("status {}", response.status),
            Err(err) => err.to_string(),
        };
        if Instant::now() >= deadline {
            return Err(HarnessError::SetupFatal(format!("{url} not ready: {last}")));
        }
        sleep(READINESS_INTERVAL).await;
    }
}
