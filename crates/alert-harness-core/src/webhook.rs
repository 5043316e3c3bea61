// crates/alert-harness-core/src/webhook.rs
// ============================================================================
// Module: Webhook Payloads
// Description: Alert notification bodies delivered to the mock receiver.
// Purpose: Decode recorded deliveries into firing alerts.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Only `alerts[].status`, `alerts[].labels`, and `alerts[].annotations` are
//! typed; every other field of the notification is kept in `extras`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::HarnessError;
use crate::error::Result;
use crate::mock_receiver::RecordedRequest;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Alert state reported in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Condition currently met.
    Firing,
    /// Condition no longer met.
    Resolved,
    /// Any other status string.
    #[serde(untagged)]
    Other(String),
}

/// One alert inside a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiringAlert {
    /// Alert state.
    pub status: AlertStatus,
    /// Alert labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Alert annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl FiringAlert {
    /// Returns true when the alert is firing.
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.status == AlertStatus::Firing
    }
}

/// Notification body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Alerts carried by this notification.
    #[serde(default)]
    pub alerts: Vec<FiringAlert>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl WebhookPayload {
    /// Decodes a recorded delivery.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] when the body is not a notification.
    pub fn from_request(request: &RecordedRequest) -> Result<Self> {
        let text = request.body_text()?;
        serde_json::from_str(&text).map_err(|err| {
            HarnessError::Json(format!("webhook body at {}: {err}: {text}", request.url))
        })
    }
}

/// Flattens the alerts of every delivery, preserving arrival order.
///
/// # Errors
///
/// Returns the first decode failure.
pub fn collect_alerts(requests: &[RecordedRequest]) -> Result<Vec<FiringAlert>> {
    let mut alerts = Vec::new();
    for request in requests {
        alerts.extend(WebhookPayload::from_request(request)?.alerts);
    }
    Ok(alerts)
}

/// Deliveries split into the alerts that decoded and one message per
/// delivery that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedDeliveries {
    /// Alerts of every decodable delivery, in arrival order.
    pub alerts: Vec<FiringAlert>,
    /// `delivery <n> undecodable: <error>`, with `n` counted from 1.
    pub undecodable: Vec<String>,
}

/// Like [`collect_alerts`] but keeps going past bodies that fail to decode.
#[must_use]
pub fn decode_deliveries(requests: &[RecordedRequest]) -> DecodedDeliveries {
    let mut decoded = DecodedDeliveries::default();
    for (index, request) in requests.iter().enumerate() {
        match WebhookPayload::from_request(request) {
            Ok(payload) => decoded.alerts.extend(payload.alerts),
            Err(err) => {
                decoded.undecodable.push(format!("delivery {} undecodable: {err}", index + 1));
            }
        }
    }
    decoded
}
