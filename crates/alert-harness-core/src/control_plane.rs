// crates/alert-harness-core/src/control_plane.rs
// ============================================================================
// Module: Rule and Channel Control Plane
// Description: Authenticated channel and rule operations against the SUT.
// Purpose: Route every rule notification to the test webhook.
// Dependencies: async-trait, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`ControlPlane`] is the seam the orchestrator drives;
//! [`ControlPlaneClient`] implements it over the SUT's HTTP API with a bearer
//! token.
//!
//! Invariants:
//! - [`ControlPlane::ensure_channel`] never creates a second channel with an
//!   existing name.
//! - A created channel whose response carries no id is referred to by name.
//! - The id a client first resolves for a channel name is the id it returns
//!   for that name from then on.
//! - Rules are retargeted at the channel before they are posted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::error::HarnessError;
use crate::error::Result;
use crate::http::ApiClient;
use crate::rule::RulePayload;

// ============================================================================
// SECTION: Channels
// ============================================================================

/// A webhook notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Unique channel name.
    pub name: String,
    /// Webhook URL reachable from the SUT.
    pub url: String,
    /// Whether resolutions are delivered too.
    #[serde(default)]
    pub send_resolved: bool,
}

impl ChannelSpec {
    /// Creation document with a single webhook config.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        json!({
            "name": self.name,
            "webhook_configs": [{
                "send_resolved": self.send_resolved,
                "url": self.url,
                "http_config": {},
            }],
        })
    }
}

// ============================================================================
// SECTION: Control Plane Seam
// ============================================================================

/// Channel and rule operations on the SUT.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the id of the channel named `channel.name`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when listing or creation fails.
    async fn ensure_channel(&self, channel: &ChannelSpec) -> Result<String>;

    /// Retargets `rule` at `channel_id`, installs it, and returns the rule id.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the SUT rejects the rule or omits its id.
    async fn create_rule(&self, rule: RulePayload, channel_id: &str) -> Result<String>;

    /// Deletes a rule.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Cleanup`] when the SUT does not confirm.
    async fn delete_rule(&self, rule_id: &str) -> Result<()>;

    /// Sends a test notification through `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the SUT does not answer 2xx.
    async fn test_channel(&self, channel: &ChannelSpec) -> Result<()>;

    /// Deletes a rule, logging instead of raising on failure. Returns whether
    /// the deletion was confirmed.
    async fn delete_rule_logged(&self, rule_id: &str) -> bool {
        match self.delete_rule(rule_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(rule_id, error = %err, "rule delete failed");
                false
            }
        }
    }
}

// ============================================================================
// SECTION: HTTP Client
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    data: Vec<ChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    #[serde(default)]
    data: Option<CreatedData>,
}

#[derive(Debug, Deserialize)]
struct CreatedData {
    #[serde(default)]
    id: Value,
}

/// SUT API client authenticated with an admin bearer token.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// Authenticated client.
    api: ApiClient,
    /// Channel name to the id rules are routed with.
    resolved: Arc<Mutex<BTreeMap<String, String>>>,
}

impl ControlPlaneClient {
    /// Builds a client for the SUT at `sut_url`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SetupFatal`] when the HTTP client cannot be built.
    pub fn new(sut_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(sut_url, timeout)?.with_bearer(token),
            resolved: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Returns the pinned id for `name`, pinning `candidate` if none exists.
    fn pin(&self, name: &str, candidate: String) -> String {
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        resolved.entry(name.to_string()).or_insert(candidate).clone()
    }

    fn forget(&self, name: &str) {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner).remove(name);
    }
}

#[async_trait]
impl ControlPlane for ControlPlaneClient {
    async fn ensure_channel(&self, channel: &ChannelSpec) -> Result<String> {
        let listing = self.api.send(Method::GET, "/api/v1/channels", None).await?;
        let channels: ChannelList = listing.json()?;
        if let Some(existing) = channels.data.iter().find(|entry| entry.name == channel.name) {
            let listed = id_text(&existing.id).unwrap_or_else(|| channel.name.clone());
            let id = self.pin(&channel.name, listed);
            info!(channel = %channel.name, channel_id = %id, "channel reused");
            return Ok(id);
        }
        self.forget(&channel.name);
        let created =
            self.api.send(Method::POST, "/api/v1/channels", Some(&channel.to_wire())).await?;
        let id = if created.body.trim().is_empty() {
            None
        } else {
            created.json::<Created>()?.data.and_then(|data| id_text(&data.id))
        };
        let id = self.pin(&channel.name, id.unwrap_or_else(|| channel.name.clone()));
        let status = created.status;
        info!(channel = %channel.name, channel_id = %id, status, "channel created");
        Ok(id)
    }

    async fn create_rule(&self, mut rule: RulePayload, channel_id: &str) -> Result<String> {
        rule.retarget(channel_id);
        let body = serde_json::to_value(&rule)?;
        let response = self.api.send(Method::POST, "/api/v1/rules", Some(&body)).await?;
        let created: Created = response.json()?;
        let id = created.data.and_then(|data| id_text(&data.id)).ok_or_else(|| {
            let status = response.status;
            HarnessError::bad_body(&response.url, status, "missing data.id", &response.body)
        })?;
        info!(rule_id = %id, rule = %rule.alert, channel_id, "rule created");
        Ok(id)
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        let path = format!("/api/v1/rules/{rule_id}");
        self.api
            .send(Method::DELETE, &path, None)
            .await
            .map_err(|err| HarnessError::Cleanup(format!("delete rule {rule_id}: {err}")))?;
        info!(rule_id, "rule deleted");
        Ok(())
    }

    async fn test_channel(&self, channel: &ChannelSpec) -> Result<()> {
        self.api.send(Method::POST, "/api/v1/testChannel", Some(&channel.to_wire())).await?;
        info!(channel = %channel.name, "test notification sent");
        Ok(())
    }
}

fn id_text(id: &Value) -> Option<String> {
    match id {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
