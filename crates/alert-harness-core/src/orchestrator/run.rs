// crates/alert-harness-core/src/orchestrator/run.rs
// ============================================================================
// Module: Orchestrator Run Loop
// Description: Channel, rule, inject, verify, and cleanup for one case.
// Purpose: Execute alert test cases against injected collaborators.
// Dependencies: tokio, tracing, uuid
// ============================================================================

//! ## Overview
//! [`Orchestrator::run_case`] walks the phases in a fixed order: ensure the
//! channel, install the rule, plant the data, verify. Cleanup runs after
//! every case whatever the outcome: tracked rules are deleted once and the
//! webhook journal is reset. The channel outlives cases.
//!
//! Invariants:
//! - `ensure_channel` happens before `create_rule`, which happens before
//!   data injection.
//! - A negative case never passes before its wait elapsed.
//! - A positive case never waits longer than its wait plus one poll interval.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tokio::time::Instant;
use tokio::time::sleep;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::AlertExpectations;
use super::AlertTestCase;
use super::report::AssertionReport;
use super::report::REPORTED_BODIES;
use super::verify::Verdict;
use super::verify::evaluate;
use crate::control_plane::ChannelSpec;
use crate::control_plane::ControlPlane;
use crate::error::HarnessError;
use crate::error::Result;
use crate::mock_receiver::MAX_POLL_INTERVAL;
use crate::mock_receiver::MockReceiver;
use crate::mock_receiver::RecordedRequest;
use crate::mock_receiver::StubMapping;
use crate::telemetry::IngestSummary;
use crate::telemetry::TelemetryIngestor;
use crate::telemetry::now_millis;
use crate::webhook::FiringAlert;
use crate::webhook::collect_alerts;
use crate::webhook::decode_deliveries;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Method the SUT delivers notifications with.
const WEBHOOK_METHOD: &str = "POST";

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// What a passing case installed and observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    /// Case name.
    pub case: String,
    /// Channel the rule notified.
    pub channel_id: String,
    /// Rules installed by the case.
    pub rule_ids: Vec<String>,
    /// Planted telemetry.
    pub ingest: IngestSummary,
    /// Alerts observed at the webhook.
    pub observed_alerts: Vec<FiringAlert>,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Runs alert test cases end to end.
pub struct Orchestrator {
    /// SUT channel and rule operations.
    control: Arc<dyn ControlPlane>,
    /// Webhook sink.
    receiver: Arc<dyn MockReceiver>,
    /// Telemetry writer.
    ingestor: TelemetryIngestor,
    /// Channel name, unique per run.
    channel_name: String,
    /// Mock base URL as seen from the SUT's network.
    webhook_base_url: String,
    /// Whether the channel delivers resolutions.
    send_resolved: bool,
    /// Channel once its webhook stub is installed.
    channel: Option<ChannelSpec>,
    /// Rules installed by the running case.
    active_rules: Vec<String>,
}

impl Orchestrator {
    /// Builds an orchestrator with a fresh channel name.
    ///
    /// `webhook_base_url` is the mock receiver's container-network URL.
    #[must_use]
    pub fn new(
        control: Arc<dyn ControlPlane>,
        receiver: Arc<dyn MockReceiver>,
        ingestor: TelemetryIngestor,
        webhook_base_url: &str,
    ) -> Self {
        Self {
            control,
            receiver,
            ingestor,
            channel_name: Uuid::new_v4().to_string(),
            webhook_base_url: webhook_base_url.trim_end_matches('/').to_string(),
            send_resolved: false,
            channel: None,
            active_rules: Vec::new(),
        }
    }

    /// Uses a fixed channel name.
    #[must_use]
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// Delivers resolution notifications too.
    #[must_use]
    pub const fn with_send_resolved(mut self, send_resolved: bool) -> Self {
        self.send_resolved = send_resolved;
        self
    }

    /// Path the SUT posts notifications to.
    #[must_use]
    pub fn webhook_path(&self) -> String {
        format!("/alert/{}", self.channel_name)
    }

    /// Rules installed and not yet cleaned up.
    #[must_use]
    pub fn active_rules(&self) -> &[String] {
        &self.active_rules
    }

    /// Runs one case; cleanup always runs and never masks the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first setup failure, or [`HarnessError::Assertion`] when
    /// expectations are not met.
    pub async fn run_case(&mut self, case: &AlertTestCase) -> Result<CaseOutcome> {
        info!(case = %case.name, "alert case started");
        let outcome = self.execute(case).await;
        self.cleanup().await;
        match &outcome {
            Ok(_) => info!(case = %case.name, "alert case passed"),
            Err(err) => warn!(case = %case.name, error = %err, "alert case failed"),
        }
        outcome
    }

    /// Deletes every tracked rule once and resets the webhook journal.
    /// Failures are logged.
    pub async fn cleanup(&mut self) {
        for rule_id in std::mem::take(&mut self.active_rules) {
            self.control.delete_rule_logged(&rule_id).await;
        }
        if let Err(err) = self.receiver.reset_journal().await {
            warn!(error = %err, "webhook journal reset failed");
        }
    }

    async fn execute(&mut self, case: &AlertTestCase) -> Result<CaseOutcome> {
        let payload = case.rule.resolve(case.base_dir.as_deref())?;
        let series = case.load_series()?;
        let webhook_path = self.webhook_path();
        self.ensure_clean_journal(&webhook_path).await?;

        let channel_id = self.ensure_channel().await?;
        debug!(case = %case.name, channel_id = %channel_id, "channel ready");

        let rule_id = self.control.create_rule(payload, &channel_id).await?;
        debug!(case = %case.name, rule_id = %rule_id, "rule installed");
        self.active_rules.push(rule_id);

        let ingest = self.ingestor.ingest(&series, now_millis()).await?;
        debug!(case = %case.name, samples = ingest.samples, "data injected");

        let report = AssertionReport {
            case: case.name.clone(),
            rule_ids: self.active_rules.clone(),
            channel_id: channel_id.clone(),
            webhook_path: webhook_path.clone(),
            expected_labels: case.expectations.verify_labels.clone(),
            expected_annotations: case.expectations.verify_annotations.clone(),
            ..AssertionReport::default()
        };
        let observed_alerts = if case.expectations.should_fire {
            self.verify_fires(&case.expectations, &webhook_path, report).await?
        } else {
            self.verify_silent(&case.expectations, &webhook_path, report).await?;
            Vec::new()
        };
        Ok(CaseOutcome {
            case: case.name.clone(),
            channel_id,
            rule_ids: self.active_rules.clone(),
            ingest,
            observed_alerts,
        })
    }

    async fn ensure_clean_journal(&self, webhook_path: &str) -> Result<()> {
        let leftover = self.receiver.count_requests(WEBHOOK_METHOD, webhook_path).await?;
        if leftover > 0 {
            warn!(leftover, path = webhook_path, "webhook journal not empty; resetting");
            self.receiver.reset_journal().await?;
        }
        Ok(())
    }

    async fn ensure_channel(&mut self) -> Result<String> {
        let spec = match &self.channel {
            Some(spec) => spec.clone(),
            None => {
                let path = self.webhook_path();
                self.receiver.install_stubs(&[StubMapping::new(WEBHOOK_METHOD, &path)]).await?;
                ChannelSpec {
                    name: self.channel_name.clone(),
                    url: format!("{}{path}", self.webhook_base_url),
                    send_resolved: self.send_resolved,
                }
            }
        };
        let id = self.control.ensure_channel(&spec).await?;
        self.channel = Some(spec);
        Ok(id)
    }

    async fn verify_fires(
        &self,
        expectations: &AlertExpectations,
        webhook_path: &str,
        report: AssertionReport,
    ) -> Result<Vec<FiringAlert>> {
        let deadline = Instant::now() + expectations.wait_time();
        let predicate = |requests: &[RecordedRequest]| {
            collect_alerts(requests)
                .is_ok_and(|alerts| evaluate(expectations, &alerts).is_satisfied())
        };
        let requests = self
            .receiver
            .wait_for_requests(WEBHOOK_METHOD, webhook_path, &predicate, deadline)
            .await?;
        let decoded = decode_deliveries(&requests);
        let mut missing = decoded.undecodable;
        match evaluate(expectations, &decoded.alerts) {
            Verdict::Satisfied if missing.is_empty() => return Ok(decoded.alerts),
            Verdict::Satisfied => {}
            Verdict::Pending {
                missing: unmet,
            } => missing.extend(unmet),
        }
        Err(HarnessError::Assertion(Box::new(AssertionReport {
            reason: format!("expectation not met within {}s", expectations.wait_time().as_secs()),
            observed_requests: requests.len(),
            observed_alerts: decoded.alerts,
            missing,
            last_bodies: last_bodies(&requests),
            ..report
        })))
    }

    async fn verify_silent(
        &self,
        expectations: &AlertExpectations,
        webhook_path: &str,
        report: AssertionReport,
    ) -> Result<()> {
        let deadline = Instant::now() + expectations.wait_time();
        loop {
            let count = self.receiver.count_requests(WEBHOOK_METHOD, webhook_path).await?;
            if count > 0 {
                let requests = self.receiver.find_requests(WEBHOOK_METHOD, webhook_path).await?;
                return Err(HarnessError::Assertion(Box::new(AssertionReport {
                    reason: format!("expected no notification, observed {count}"),
                    observed_requests: requests.len(),
                    observed_alerts: decode_deliveries(&requests).alerts,
                    last_bodies: last_bodies(&requests),
                    ..report
                })));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            sleep(MAX_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

fn last_bodies(requests: &[RecordedRequest]) -> Vec<String> {
    let skip = requests.len().saturating_sub(REPORTED_BODIES);
    requests
        .iter()
        .skip(skip)
        .map(|request| request.body_text().unwrap_or_else(|_| request.body_base64.clone()))
        .collect()
}
