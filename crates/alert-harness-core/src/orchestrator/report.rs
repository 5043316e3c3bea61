// crates/alert-harness-core/src/orchestrator/report.rs
// ============================================================================
// Module: Assertion Report
// Description: Diagnostic payload of a failed alert expectation.
// Purpose: Show what was installed, expected, and observed in one place.
// Dependencies: serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::webhook::AlertStatus;
use crate::webhook::FiringAlert;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Recorded request bodies kept in a report.
pub const REPORTED_BODIES: usize = 5;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Why an alert case failed, with everything needed to debug it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssertionReport {
    /// Case name.
    pub case: String,
    /// One-line failure reason.
    pub reason: String,
    /// Rules the case installed.
    pub rule_ids: Vec<String>,
    /// Channel the rules notify.
    pub channel_id: String,
    /// Webhook path that was polled.
    pub webhook_path: String,
    /// Requests recorded on the webhook path.
    pub observed_requests: usize,
    /// Alerts decoded from those requests, in arrival order.
    pub observed_alerts: Vec<FiringAlert>,
    /// Expected labels.
    pub expected_labels: BTreeMap<String, String>,
    /// Expected annotations.
    pub expected_annotations: BTreeMap<String, String>,
    /// Unmet expectations, one per line.
    pub missing: Vec<String>,
    /// Newest recorded bodies, oldest first.
    pub last_bodies: Vec<String>,
}

impl fmt::Display for AssertionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "alert case {} failed: {}", self.case, self.reason)?;
        writeln!(f, "  channel: {}", self.channel_id)?;
        writeln!(f, "  rules: [{}]", self.rule_ids.join(", "))?;
        writeln!(f, "  webhook path: {}", self.webhook_path)?;
        writeln!(
            f,
            "  observed: {} request(s), {} alert(s)",
            self.observed_requests,
            self.observed_alerts.len()
        )?;
        writeln!(f, "  expected labels: {}", render_map(&self.expected_labels))?;
        writeln!(f, "  expected annotations: {}", render_map(&self.expected_annotations))?;
        for line in &self.missing {
            writeln!(f, "  missing: {line}")?;
        }
        for (index, alert) in self.observed_alerts.iter().enumerate() {
            let status = match &alert.status {
                AlertStatus::Firing => "firing",
                AlertStatus::Resolved => "resolved",
                AlertStatus::Other(other) => other.as_str(),
            };
            writeln!(f, "  alert[{index}] {status} labels={}", render_map(&alert.labels))?;
        }
        for body in &self.last_bodies {
            writeln!(f, "  body: {body}")?;
        }
        Ok(())
    }
}

fn render_map(map: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = map.iter().map(|(key, value)| format!("{key}={value}")).collect();
    format!("{{{}}}", pairs.join(", "))
}
