// crates/alert-harness-core/src/lib.rs
// ============================================================================
// Module: Alert Harness Core Library
// Description: Fixture lifecycle, mock receiver, telemetry, control plane, and
//              the alert test orchestrator.
// Purpose: Drive declarative alert tests against a live observability backend.
// Dependencies: clickhouse, reqwest, testcontainers, tokio, tracing
// ============================================================================

//! ## Overview
//! The crate is layered leaves first:
//! - [`fixture`] and [`container`]: resources with create, reuse, and
//!   teardown-only lifecycles.
//! - [`mock_receiver`]: stub programming and request journal queries.
//! - [`telemetry`]: metric series expansion, fingerprints, and store writes.
//! - [`control_plane`] and [`session`]: authenticated channel and rule calls.
//! - [`orchestrator`]: the four-phase alert test protocol.
//! - [`environment`]: container stack provisioning and collaborator wiring.
//!
//! Security posture: the harness talks only to the services it starts or is
//! pointed at, and credentials come from configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod container;
pub mod control_plane;
pub mod environment;
pub mod error;
pub mod fixture;
pub mod http;
pub mod mock_receiver;
pub mod orchestrator;
pub mod rule;
pub mod session;
pub mod telemetry;
pub mod webhook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use container::ContainerHandle;
pub use container::ContainerRuntime;
pub use container::ContainerSpec;
pub use container::UrlConfig;
pub use control_plane::ChannelSpec;
pub use control_plane::ControlPlane;
pub use control_plane::ControlPlaneClient;
pub use environment::ResolvedEndpoints;
pub use environment::TestEnvironment;
pub use error::ErrorKind;
pub use error::HarnessError;
pub use error::Result;
pub use fixture::FixtureStack;
pub use fixture::LifecycleFlags;
pub use fixture::ResourceCache;
pub use fixture::ResourceFactory;
pub use mock_receiver::MockReceiver;
pub use mock_receiver::MockReceiverClient;
pub use mock_receiver::RecordedRequest;
pub use mock_receiver::StubMapping;
pub use orchestrator::AlertData;
pub use orchestrator::AlertExpectations;
pub use orchestrator::AlertTestCase;
pub use orchestrator::AssertionReport;
pub use orchestrator::ExpectedAlert;
pub use orchestrator::Orchestrator;
pub use rule::CompareOp;
pub use rule::MatchType;
pub use rule::RulePayload;
pub use rule::RuleSource;
pub use rule::RuleSpec;
pub use session::AdminSession;
pub use telemetry::MetricPoint;
pub use telemetry::MetricSeries;
pub use telemetry::MetricsSink;
pub use telemetry::TelemetryIngestor;
pub use telemetry::Temporality;
pub use webhook::FiringAlert;
pub use webhook::WebhookPayload;
