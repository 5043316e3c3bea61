// crates/alert-harness-core/src/telemetry/ingest.rs
// ============================================================================
// Module: Telemetry Ingestor
// Description: Converts metric series into store rows and writes them.
// Purpose: Plant exact values and timestamps ahead of rule evaluation.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! [`TelemetryIngestor::ingest`] expands every series against one base time,
//! fingerprints each label set (plus `__name__`), builds one series row per
//! hour bucket the samples touch, and hands the whole batch to the sink.
//!
//! Invariants:
//! - Samples of one series are written in timestamp order.
//! - The batch is written in one sink call; a failure aborts the ingest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use super::fingerprint::fingerprint;
use super::series::MetricPoint;
use super::series::MetricSeries;
use super::store::MetricsSink;
use super::store::RowBatch;
use super::store::SampleRow;
use super::store::TimeSeriesRow;
use crate::error::Result;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label holding the metric name inside the stored label set.
pub const NAME_LABEL: &str = "__name__";
/// Label selecting the row's `env` column.
pub const ENV_LABEL: &str = "deployment.environment";
/// `env` used when the label set has no environment.
pub const DEFAULT_ENV: &str = "default";
/// Width of a series-row bucket.
const HOUR_MS: i64 = 3_600_000;

// ============================================================================
// SECTION: Summary
// ============================================================================

/// What one ingest wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Series written.
    pub series: usize,
    /// Samples written.
    pub samples: usize,
    /// Earliest sample time, if any.
    pub first_ms: Option<i64>,
    /// Latest sample time, if any.
    pub last_ms: Option<i64>,
}

// ============================================================================
// SECTION: Ingestor
// ============================================================================

/// Writes metric series straight into the telemetry store.
#[derive(Clone)]
pub struct TelemetryIngestor {
    /// Row destination.
    sink: Arc<dyn MetricsSink>,
}

impl TelemetryIngestor {
    /// Wraps a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            sink,
        }
    }

    /// Returns the sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    /// Expands and writes `series` relative to `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error when a series is invalid or the sink rejects the batch.
    pub async fn ingest(&self, series: &[MetricSeries], now_ms: i64) -> Result<IngestSummary> {
        let (batch, summary) = build_rows(series, now_ms)?;
        if batch.is_empty() {
            info!(series = summary.series, "ingest skipped; no samples");
            return Ok(summary);
        }
        self.sink.write(&batch).await?;
        info!(
            series = summary.series,
            samples = summary.samples,
            first_ms = summary.first_ms,
            last_ms = summary.last_ms,
            "telemetry ingested"
        );
        Ok(summary)
    }

    /// Clears the store tables.
    ///
    /// # Errors
    ///
    /// Returns an error when the sink fails to truncate.
    pub async fn truncate(&self) -> Result<()> {
        self.sink.truncate().await
    }
}

// ============================================================================
// SECTION: Row Building
// ============================================================================

/// Builds the rows for `series` without writing them.
///
/// # Errors
///
/// Returns an error when a series fails to expand.
pub fn build_rows(series: &[MetricSeries], now_ms: i64) -> Result<(RowBatch, IngestSummary)> {
    let mut batch = RowBatch::default();
    let mut summary = IngestSummary::default();
    for entry in series {
        let mut points = entry.expand(now_ms)?;
        points.sort_by_key(|point| point.timestamp_ms);
        summary.series += 1;
        summary.samples += points.len();
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            let (first, last) = (first.timestamp_ms, last.timestamp_ms);
            summary.first_ms = Some(summary.first_ms.map_or(first, |ms| ms.min(first)));
            summary.last_ms = Some(summary.last_ms.map_or(last, |ms| ms.max(last)));
        }
        append_series(&mut batch, entry, &points)?;
    }
    Ok((batch, summary))
}

fn append_series(
    batch: &mut RowBatch,
    series: &MetricSeries,
    points: &[MetricPoint],
) -> Result<()> {
    let mut labels: BTreeMap<String, String> = series.labels.clone();
    labels.insert(NAME_LABEL.to_string(), series.metric_name.clone());
    let hash = fingerprint(&labels).hash;
    let labels_json = serde_json::to_string(&labels)?;
    let env = labels.get(ENV_LABEL).map_or_else(|| DEFAULT_ENV.to_string(), Clone::clone);
    let temporality = series.temporality.as_store_str().to_string();

    let buckets: BTreeSet<i64> =
        points.iter().map(|point| hour_floor(point.timestamp_ms)).collect();
    for bucket in buckets {
        batch.series.push(TimeSeriesRow {
            env: env.clone(),
            temporality: temporality.clone(),
            metric_name: series.metric_name.clone(),
            description: series.description.clone(),
            unit: series.unit.clone(),
            metric_type: series.temporality.metric_type().to_string(),
            is_monotonic: series.is_monotonic(),
            fingerprint: hash,
            unix_milli: bucket,
            labels: labels_json.clone(),
            normalized: false,
        });
    }
    batch.samples.extend(points.iter().map(|point| SampleRow {
        env: env.clone(),
        temporality: temporality.clone(),
        metric_name: point.metric_name.clone(),
        fingerprint: hash,
        unix_milli: point.timestamp_ms,
        value: point.value,
    }));
    Ok(())
}

const fn hour_floor(timestamp_ms: i64) -> i64 {
    timestamp_ms - timestamp_ms.rem_euclid(HOUR_MS)
}
