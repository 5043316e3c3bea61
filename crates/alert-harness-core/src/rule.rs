// crates/alert-harness-core/src/rule.rs
// ============================================================================
// Module: Alert Rules
// Description: Typed rule specs and the rule document posted to the SUT.
// Purpose: Build threshold rules and retarget them at the test channel.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`RuleSpec`] is the typed way to describe a threshold rule. It renders to
//! a [`RulePayload`], the document the SUT accepts. Raw documents loaded from
//! disk use the same payload type: the fields the harness touches are typed
//! and everything else rides along in `extras`.
//!
//! Invariants:
//! - [`RulePayload::retarget`] leaves exactly one channel in
//!   `preferredChannels` and in every threshold that routes to channels.
//! - Unknown document fields survive a load and re-serialize unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::error::HarnessError;
use crate::error::Result;
use crate::telemetry::Temporality;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rule schema version emitted by [`RuleSpec::to_payload`].
pub const RULE_SCHEMA_VERSION: &str = "v2alpha1";
/// Threshold kind whose entries carry per-level channels.
pub const BASIC_THRESHOLD_KIND: &str = "basic";
/// Query every generated rule selects.
const QUERY_NAME: &str = "A";

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Value greater than the target.
    Above,
    /// Value less than the target.
    Below,
    /// Value equal to the target.
    EqualTo,
    /// Value different from the target.
    NotEqualTo,
}

impl CompareOp {
    /// Code the SUT expects on the wire.
    #[must_use]
    pub const fn wire_code(self) -> &'static str {
        match self {
            Self::Above => "1",
            Self::Below => "2",
            Self::EqualTo => "3",
            Self::NotEqualTo => "4",
        }
    }
}

/// How samples in the window are folded before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Any sample satisfies the comparison.
    AtLeastOnce,
    /// Every sample satisfies the comparison.
    AllTheTime,
    /// The mean satisfies the comparison.
    OnAverage,
    /// The sum satisfies the comparison.
    InTotal,
    /// The newest sample satisfies the comparison.
    Last,
}

impl MatchType {
    /// Code the SUT expects on the wire.
    #[must_use]
    pub const fn wire_code(self) -> &'static str {
        match self {
            Self::AtLeastOnce => "1",
            Self::AllTheTime => "2",
            Self::OnAverage => "3",
            Self::InTotal => "4",
            Self::Last => "5",
        }
    }
}

/// Aggregation operator applied over time and across series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationOp {
    /// Mean.
    #[default]
    Avg,
    /// Sum.
    Sum,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
    /// Sample count.
    Count,
}

impl AggregationOp {
    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }

    /// Operator used to combine series; counts are summed.
    #[must_use]
    pub const fn space_aggregation(self) -> &'static str {
        match self {
            Self::Count => "sum",
            other => other.as_str(),
        }
    }
}

// ============================================================================
// SECTION: Rule Spec
// ============================================================================

/// Query the rule evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregation {
    /// Aggregation operator.
    #[serde(default)]
    pub op: AggregationOp,
    /// Metric to query.
    pub metric_name: String,
    /// Temporality the metric was written with.
    #[serde(default)]
    pub temporality: Temporality,
    /// Time aggregation overriding `op` (for example `increase` or `rate`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_aggregation: Option<String>,
    /// Attributes to group by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// Filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Aggregation {
    fn to_query(&self, step_sec: u64) -> Value {
        let temporality = match self.temporality {
            Temporality::Unspecified => "unspecified",
            Temporality::Delta => "delta",
            Temporality::Cumulative => "cumulative",
        };
        let mut spec = json!({
            "name": QUERY_NAME,
            "signal": "metrics",
            "aggregations": [{
                "metricName": self.metric_name,
                "temporality": temporality,
                "timeAggregation": self.time_aggregation.as_deref().unwrap_or(self.op.as_str()),
                "spaceAggregation": self.op.space_aggregation(),
            }],
            "stepInterval": step_sec,
            "disabled": false,
        });
        if !self.group_by.is_empty() {
            let group_by: Vec<Value> = self
                .group_by
                .iter()
                .map(|name| {
                    json!({"name": name, "fieldDataType": "string", "fieldContext": "attribute"})
                })
                .collect();
            spec["groupBy"] = Value::Array(group_by);
        }
        if let Some(filter) = &self.filter {
            spec["filter"] = json!({ "expression": filter });
        }
        json!({
            "queryType": "builder",
            "panelType": "graph",
            "queries": [{ "type": "builder_query", "spec": spec }],
        })
    }
}

/// One threshold level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Threshold {
    /// Level name, delivered as the `threshold.name` label.
    pub label: String,
    /// Target value.
    pub value: f64,
    /// Comparison against the target.
    pub compare_op: CompareOp,
    /// Sample folding before comparison.
    pub match_type: MatchType,
    /// Value at which the alert recovers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_value: Option<f64>,
    /// Unit of the target value.
    #[serde(default)]
    pub unit: String,
}

/// A threshold alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Rule name, delivered as the `alertname` label.
    pub alert_name: String,
    /// Human-readable description annotation.
    #[serde(default)]
    pub description: String,
    /// Evaluation window in seconds.
    #[serde(default = "default_eval_window_sec")]
    pub eval_window_sec: u64,
    /// Evaluation frequency in seconds.
    #[serde(default = "default_frequency_sec")]
    pub frequency_sec: u64,
    /// Evaluated query.
    pub aggregation: Aggregation,
    /// Threshold levels; the first drives the legacy condition fields.
    pub thresholds: Vec<Threshold>,
    /// Channels notified; replaced with the test channel before install.
    #[serde(default)]
    pub preferred_channels: Vec<String>,
    /// Extra labels attached to every alert.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Extra annotations attached to every alert.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl RuleSpec {
    /// Renders the document the SUT accepts.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] when the spec has no thresholds,
    /// no name, or a zero window.
    pub fn to_payload(&self) -> Result<RulePayload> {
        let first = self.validate()?;
        let eval_window = go_duration(self.eval_window_sec);
        let frequency = go_duration(self.frequency_sec);
        let levels: Vec<Value> = self
            .thresholds
            .iter()
            .map(|threshold| {
                json!({
                    "name": threshold.label,
                    "target": threshold.value,
                    "targetUnit": threshold.unit,
                    "recoveryTarget": threshold.recovery_value,
                    "matchType": threshold.match_type.wire_code(),
                    "op": threshold.compare_op.wire_code(),
                    "channels": self.preferred_channels,
                })
            })
            .collect();
        let mut annotations = self.annotations.clone();
        if !self.description.is_empty() {
            annotations
                .entry("description".to_string())
                .or_insert_with(|| self.description.clone());
        }
        let document = json!({
            "alert": self.alert_name,
            "alertType": "METRIC_BASED_ALERT",
            "ruleType": "threshold_rule",
            "description": self.description,
            "evalWindow": eval_window,
            "frequency": frequency,
            "condition": {
                "compositeQuery": self.aggregation.to_query(self.frequency_sec),
                "op": first.compare_op.wire_code(),
                "target": first.value,
                "matchType": first.match_type.wire_code(),
                "selectedQueryName": QUERY_NAME,
                "thresholds": { "kind": BASIC_THRESHOLD_KIND, "spec": levels },
            },
            "labels": self.labels,
            "annotations": annotations,
            "disabled": false,
            "preferredChannels": self.preferred_channels,
            "version": "v5",
            "evaluation": {
                "kind": "rolling",
                "spec": { "evalWindow": eval_window, "frequency": frequency },
            },
            "schemaVersion": RULE_SCHEMA_VERSION,
            "notificationSettings": {},
        });
        Ok(serde_json::from_value(document)?)
    }

    fn validate(&self) -> Result<&Threshold> {
        if self.alert_name.trim().is_empty() {
            return Err(HarnessError::InvalidInput("rule alert_name must not be empty".to_string()));
        }
        if self.eval_window_sec == 0 || self.frequency_sec == 0 {
            return Err(HarnessError::InvalidInput(format!(
                "rule {}: eval window and frequency must be greater than zero",
                self.alert_name
            )));
        }
        if let Some(bad) = self.thresholds.iter().find(|threshold| !threshold.value.is_finite()) {
            return Err(HarnessError::InvalidInput(format!(
                "rule {}: threshold {} is not finite",
                self.alert_name, bad.label
            )));
        }
        self.thresholds.first().ok_or_else(|| {
            HarnessError::InvalidInput(format!("rule {} has no thresholds", self.alert_name))
        })
    }
}

// ============================================================================
// SECTION: Rule Payload
// ============================================================================

/// One entry of the `thresholds.spec` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevel {
    /// Channels this level notifies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// The `condition.thresholds` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Threshold kind.
    #[serde(default)]
    pub kind: String,
    /// Levels.
    #[serde(default)]
    pub spec: Vec<ThresholdLevel>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// The `condition` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Threshold levels, when the rule uses them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdSet>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// Rule document as posted to the SUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulePayload {
    /// Rule name.
    pub alert: String,
    /// Channels notified.
    #[serde(rename = "preferredChannels", default)]
    pub preferred_channels: Vec<String>,
    /// Evaluation condition.
    #[serde(default)]
    pub condition: RuleCondition,
    /// Remaining fields.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl RulePayload {
    /// Loads a raw JSON rule document.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not a rule document.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|err| HarnessError::Io(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|err| HarnessError::InvalidInput(format!("{}: {err}", path.display())))
    }

    /// Routes every notification of the rule to `channel_id` alone.
    pub fn retarget(&mut self, channel_id: &str) {
        self.preferred_channels = vec![channel_id.to_string()];
        let Some(thresholds) = self.condition.thresholds.as_mut() else {
            return;
        };
        let basic = thresholds.kind == BASIC_THRESHOLD_KIND;
        for level in &mut thresholds.spec {
            if basic || level.channels.is_some() {
                level.channels = Some(vec![channel_id.to_string()]);
            }
        }
    }
}

/// Where a test case takes its rule from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSource {
    /// Typed spec.
    Spec {
        /// Rule spec.
        spec: RuleSpec,
    },
    /// Inline document.
    Payload {
        /// Rule document.
        payload: RulePayload,
    },
    /// Document on disk, relative paths resolved against the case file.
    File {
        /// Document path.
        path: PathBuf,
    },
}

impl RuleSource {
    /// Produces the rule document.
    ///
    /// # Errors
    ///
    /// Returns an error when the spec is invalid or the file cannot be loaded.
    pub fn resolve(&self, base_dir: Option<&Path>) -> Result<RulePayload> {
        match self {
            Self::Spec {
                spec,
            } => spec.to_payload(),
            Self::Payload {
                payload,
            } => Ok(payload.clone()),
            Self::File {
                path,
            } => match base_dir {
                Some(base) if path.is_relative() => RulePayload::from_file(&base.join(path)),
                _ => RulePayload::from_file(path),
            },
        }
    }

    /// Rule name when known without touching the filesystem.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Spec {
                spec,
            } => Some(&spec.alert_name),
            Self::Payload {
                payload,
            } => Some(&payload.alert),
            Self::File {
                ..
            } => None,
        }
    }
}

// ============================================================================
// SECTION: Durations
// ============================================================================

/// Formats whole seconds the way Go prints a `time.Duration`.
#[must_use]
pub fn go_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

const fn default_eval_window_sec() -> u64 {
    300
}

const fn default_frequency_sec() -> u64 {
    60
}
