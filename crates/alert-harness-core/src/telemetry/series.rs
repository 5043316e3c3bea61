// crates/alert-harness-core/src/telemetry/series.rs
// ============================================================================
// Module: Metric Series
// Description: Evenly spaced metric series and their expansion into samples.
// Purpose: Describe planted telemetry at a level tests can write by hand.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! A [`MetricSeries`] is one label set sampled every `interval_sec`. It
//! expands into [`MetricPoint`]s at `start + i * interval`. Unless pinned,
//! `start` is `now - len * interval` so every point lands before injection.
//!
//! Invariants:
//! - Expanded timestamps strictly increase within a series.
//! - Every expanded value is finite.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::HarnessError;
use crate::error::Result;

// ============================================================================
// SECTION: Temporality
// ============================================================================

/// Accumulation semantics of a metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporality {
    /// Instantaneous value (gauge).
    #[default]
    #[serde(alias = "Unspecified", alias = "gauge")]
    Unspecified,
    /// Per-interval increment.
    #[serde(alias = "Delta")]
    Delta,
    /// Monotonic total since start; a decrease is a reset.
    #[serde(alias = "Cumulative")]
    Cumulative,
}

impl Temporality {
    /// Store spelling of the temporality.
    #[must_use]
    pub const fn as_store_str(self) -> &'static str {
        match self {
            Self::Unspecified => "Unspecified",
            Self::Delta => "Delta",
            Self::Cumulative => "Cumulative",
        }
    }

    /// Store metric type: gauges for unspecified, sums otherwise.
    #[must_use]
    pub const fn metric_type(self) -> &'static str {
        match self {
            Self::Unspecified => "Gauge",
            Self::Delta | Self::Cumulative => "Sum",
        }
    }
}

// ============================================================================
// SECTION: Points and Series
// ============================================================================

/// One sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Metric name.
    pub metric_name: String,
    /// Label set.
    pub labels: BTreeMap<String, String>,
    /// Sample time in UTC milliseconds.
    pub timestamp_ms: i64,
    /// Sample value.
    pub value: f64,
    /// Accumulation semantics.
    pub temporality: Temporality,
    /// Whether the metric only grows between resets.
    pub is_monotonic: bool,
}

/// Evenly spaced samples on one label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSeries {
    /// Metric name.
    pub metric_name: String,
    /// Label set.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// One value per interval.
    pub values: Vec<f64>,
    /// Spacing between samples in seconds.
    #[serde(default = "default_interval_sec")]
    pub interval_sec: u64,
    /// Accumulation semantics.
    #[serde(default)]
    pub temporality: Temporality,
    /// Overrides the monotonic flag implied by the temporality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monotonic: Option<bool>,
    /// Indices that carry no sample.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub gaps: BTreeSet<usize>,
    /// Absolute start time in UTC milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<i64>,
    /// Start time relative to injection time, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_sec: Option<i64>,
    /// Metric description.
    #[serde(default)]
    pub description: String,
    /// Metric unit.
    #[serde(default)]
    pub unit: String,
}

impl MetricSeries {
    /// Builds a series with default spacing, temporality, and start.
    #[must_use]
    pub fn new<I>(metric_name: impl Into<String>, labels: I, values: Vec<f64>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            metric_name: metric_name.into(),
            labels: labels.into_iter().collect(),
            values,
            interval_sec: default_interval_sec(),
            temporality: Temporality::Unspecified,
            monotonic: None,
            gaps: BTreeSet::new(),
            start_ms: None,
            start_offset_sec: None,
            description: String::new(),
            unit: String::new(),
        }
    }

    /// Sets the sample spacing.
    #[must_use]
    pub const fn with_interval_sec(mut self, interval_sec: u64) -> Self {
        self.interval_sec = interval_sec;
        self
    }

    /// Sets the temporality.
    #[must_use]
    pub const fn with_temporality(mut self, temporality: Temporality) -> Self {
        self.temporality = temporality;
        self
    }

    /// Pins the first sample time.
    #[must_use]
    pub const fn starting_at(mut self, start_ms: i64) -> Self {
        self.start_ms = Some(start_ms);
        self
    }

    /// Returns whether samples are monotonic.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.monotonic.unwrap_or(!matches!(self.temporality, Temporality::Unspecified))
    }

    /// Returns the first sample time for an injection happening at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] when the span overflows.
    pub fn start_time_ms(&self, now_ms: i64) -> Result<i64> {
        if let Some(start) = self.start_ms {
            return Ok(start);
        }
        if let Some(offset) = self.start_offset_sec {
            return offset
                .checked_mul(1000)
                .and_then(|offset| now_ms.checked_add(offset))
                .ok_or_else(|| self.invalid("start offset overflows"));
        }
        let len = i64::try_from(self.values.len()).map_err(|_| self.invalid("too many values"))?;
        len.checked_mul(self.interval_ms()?)
            .and_then(|span| now_ms.checked_sub(span))
            .ok_or_else(|| self.invalid("series span overflows"))
    }

    /// Expands into samples for an injection happening at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] when the interval is zero, the
    /// metric name is empty, or a value is not finite.
    pub fn expand(&self, now_ms: i64) -> Result<Vec<MetricPoint>> {
        if self.metric_name.trim().is_empty() {
            return Err(HarnessError::InvalidInput("metric_name must not be empty".to_string()));
        }
        let interval = self.interval_ms()?;
        let start = self.start_time_ms(now_ms)?;
        let is_monotonic = self.is_monotonic();
        let mut timestamp = start;
        let mut points = Vec::with_capacity(self.values.len());
        for (index, value) in self.values.iter().enumerate() {
            if !value.is_finite() {
                return Err(self.invalid(&format!("value at index {index} is not finite")));
            }
            if !self.gaps.contains(&index) {
                points.push(MetricPoint {
                    metric_name: self.metric_name.clone(),
                    labels: self.labels.clone(),
                    timestamp_ms: timestamp,
                    value: *value,
                    temporality: self.temporality,
                    is_monotonic,
                });
            }
            timestamp = timestamp.checked_add(interval).ok_or_else(|| self.invalid("overflow"))?;
        }
        Ok(points)
    }

    fn interval_ms(&self) -> Result<i64> {
        if self.interval_sec == 0 {
            return Err(self.invalid("interval_sec must be greater than zero"));
        }
        i64::try_from(self.interval_sec)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .ok_or_else(|| self.invalid("interval_sec too large"))
    }

    fn invalid(&self, detail: &str) -> HarnessError {
        HarnessError::InvalidInput(format!("series {}: {detail}", self.metric_name))
    }
}

// ============================================================================
// SECTION: Files
// ============================================================================

/// Parses line-delimited series; blank lines are skipped.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidInput`] naming the first bad line.
pub fn parse_series_lines(content: &str) -> Result<Vec<MetricSeries>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|err| {
                HarnessError::InvalidInput(format!("series line {}: {err}", index + 1))
            })
        })
        .collect()
}

/// Loads a line-delimited series file.
///
/// # Errors
///
/// Returns [`HarnessError`] when the file cannot be read or a line is invalid.
pub fn load_series_file(path: &Path) -> Result<Vec<MetricSeries>> {
    let content = fs::read_to_string(path)
        .map_err(|err| HarnessError::Io(format!("{}: {err}", path.display())))?;
    parse_series_lines(&content)
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Current UTC time in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

const fn default_interval_sec() -> u64 {
    60
}
