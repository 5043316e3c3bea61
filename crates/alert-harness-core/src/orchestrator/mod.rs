// crates/alert-harness-core/src/orchestrator/mod.rs
// ============================================================================
// Module: Alert Test Orchestrator
// Description: Alert test cases, expectations, and failure reports.
// Purpose: Run declarative alert tests end to end against a live SUT.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`AlertTestCase`] pairs a rule, the telemetry to plant, and the
//! notifications expected at the webhook. [`Orchestrator`] runs it through
//! channel setup, rule install, data injection, and verification, and always
//! cleans up afterwards.
//!
//! Invariants:
//! - Every rule a case installs is deleted exactly once when the case ends.
//! - The webhook journal is empty when the next case starts.

pub mod report;
pub mod run;
pub mod verify;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

pub use report::AssertionReport;
pub use run::CaseOutcome;
pub use run::Orchestrator;
pub use verify::Verdict;
pub use verify::evaluate;

use crate::error::HarnessError;
use crate::error::Result;
use crate::rule::RuleSource;
use crate::telemetry::MetricSeries;
use crate::telemetry::load_series_file;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wait applied to positive expectations without an explicit wait.
pub const DEFAULT_FIRE_WAIT: Duration = Duration::from_secs(60);
/// Wait applied to negative expectations without an explicit wait.
pub const DEFAULT_SILENCE_WAIT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// One alert that must be observed firing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedAlert {
    /// Labels the alert must carry.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations the alert must carry.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// What a case asserts about webhook deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertExpectations {
    /// Whether the rule must fire.
    pub should_fire: bool,
    /// Minimum number of alerts delivered.
    #[serde(default = "default_num_alerts")]
    pub num_alerts: usize,
    /// Labels the last delivered alert must carry.
    #[serde(default)]
    pub verify_labels: BTreeMap<String, String>,
    /// Annotations the last delivered alert must carry.
    #[serde(default)]
    pub verify_annotations: BTreeMap<String, String>,
    /// Alerts that must each be matched by some firing alert.
    #[serde(default)]
    pub expected_alerts: Vec<ExpectedAlert>,
    /// Seconds to wait; defaults depend on `should_fire`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time_sec: Option<u64>,
}

impl AlertExpectations {
    /// Expects `num_alerts` firing alerts carrying `labels`.
    #[must_use]
    pub fn firing<I>(num_alerts: usize, labels: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            should_fire: true,
            num_alerts,
            verify_labels: labels.into_iter().collect(),
            verify_annotations: BTreeMap::new(),
            expected_alerts: Vec::new(),
            wait_time_sec: None,
        }
    }

    /// Expects no delivery at all.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            should_fire: false,
            num_alerts: 0,
            verify_labels: BTreeMap::new(),
            verify_annotations: BTreeMap::new(),
            expected_alerts: Vec::new(),
            wait_time_sec: None,
        }
    }

    /// Overrides the wait.
    #[must_use]
    pub const fn with_wait_sec(mut self, wait_time_sec: u64) -> Self {
        self.wait_time_sec = Some(wait_time_sec);
        self
    }

    /// Effective wait.
    #[must_use]
    pub const fn wait_time(&self) -> Duration {
        match self.wait_time_sec {
            Some(secs) => Duration::from_secs(secs),
            None if self.should_fire => DEFAULT_FIRE_WAIT,
            None => DEFAULT_SILENCE_WAIT,
        }
    }
}

const fn default_num_alerts() -> usize {
    1
}

// ============================================================================
// SECTION: Test Cases
// ============================================================================

/// Signal kind of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Metric series.
    Metrics,
    /// Log records.
    Logs,
    /// Trace spans.
    Traces,
}

/// A line-delimited data file referenced by a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertData {
    /// Signal kind.
    #[serde(rename = "type")]
    pub kind: SignalKind,
    /// File path, relative paths resolved against the case file.
    pub path: PathBuf,
}

/// One declarative alert test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertTestCase {
    /// Case name used in logs and reports.
    pub name: String,
    /// Rule to install.
    pub rule: RuleSource,
    /// Inline series to plant.
    #[serde(default)]
    pub series: Vec<MetricSeries>,
    /// Data files to plant.
    #[serde(default)]
    pub alert_data: Vec<AlertData>,
    /// Expected deliveries.
    pub expectations: AlertExpectations,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl AlertTestCase {
    /// Builds a case from in-memory parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        rule: RuleSource,
        series: Vec<MetricSeries>,
        expectations: AlertExpectations,
    ) -> Self {
        Self {
            name: name.into(),
            rule,
            series,
            alert_data: Vec::new(),
            expectations,
            base_dir: None,
        }
    }

    /// Loads a JSON case file; relative paths inside resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|err| HarnessError::Io(format!("{}: {err}", path.display())))?;
        let mut case: Self = serde_json::from_str(&content)
            .map_err(|err| HarnessError::InvalidInput(format!("{}: {err}", path.display())))?;
        case.base_dir = path.parent().map(Path::to_path_buf);
        Ok(case)
    }

    /// Inline series followed by the series of every data file.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] for non-metric data files and
    /// any load failure.
    pub fn load_series(&self) -> Result<Vec<MetricSeries>> {
        let mut series = self.series.clone();
        for data in &self.alert_data {
            if data.kind != SignalKind::Metrics {
                return Err(HarnessError::InvalidInput(format!(
                    "{}: only metrics data files are supported",
                    data.path.display()
                )));
            }
            let path = match &self.base_dir {
                Some(base) if data.path.is_relative() => base.join(&data.path),
                _ => data.path.clone(),
            };
            series.extend(load_series_file(&path)?);
        }
        Ok(series)
    }
}
