// crates/alert-harness-core/src/telemetry/generators.rs
// ============================================================================
// Module: Series Generators
// Description: Deterministic builders for common metric series shapes.
// Purpose: Keep alert scenarios short when the data follows a pattern.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every generator returns a [`MetricSeries`] so callers can still pin the
//! start time or tweak the interval before injecting. Generators are
//! deterministic; no randomness is involved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use super::series::MetricSeries;
use super::series::Temporality;

// ============================================================================
// SECTION: Generators
// ============================================================================

/// Gauge series with the given values.
#[must_use]
pub fn gauge(metric_name: &str, labels: &BTreeMap<String, String>, values: &[f64]) -> MetricSeries {
    series(metric_name, labels, values.to_vec(), Temporality::Unspecified)
}

/// Monotonic counter series. Cumulative counters carry the running total.
#[must_use]
pub fn counter(
    metric_name: &str,
    labels: &BTreeMap<String, String>,
    values: &[f64],
    temporality: Temporality,
) -> MetricSeries {
    series(metric_name, labels, values.to_vec(), temporality)
}

/// Sum series that may go up and down.
#[must_use]
pub fn non_monotonic_sum(
    metric_name: &str,
    labels: &BTreeMap<String, String>,
    values: &[f64],
    temporality: Temporality,
) -> MetricSeries {
    let mut series = series(metric_name, labels, values.to_vec(), temporality);
    series.monotonic = Some(false);
    series
}

/// Cumulative counter growing by `rate_per_point` that drops to zero at
/// every index in `reset_at`.
#[must_use]
pub fn counter_with_resets(
    metric_name: &str,
    labels: &BTreeMap<String, String>,
    num_points: usize,
    rate_per_point: f64,
    reset_at: &[usize],
) -> MetricSeries {
    let resets: BTreeSet<usize> = reset_at.iter().copied().collect();
    let mut value = 0.0;
    let mut values = Vec::with_capacity(num_points);
    for index in 0 .. num_points {
        if resets.contains(&index) {
            value = 0.0;
        } else {
            value += rate_per_point;
        }
        values.push(value);
    }
    series(metric_name, labels, values, Temporality::Cumulative)
}

/// Series of `total_points` slots with samples only at the given indices.
/// Indices at or beyond `total_points` are ignored.
#[must_use]
pub fn sparse(
    metric_name: &str,
    labels: &BTreeMap<String, String>,
    values_at: &BTreeMap<usize, f64>,
    total_points: usize,
    temporality: Temporality,
) -> MetricSeries {
    let mut values = vec![0.0; total_points];
    let mut gaps: BTreeSet<usize> = (0 .. total_points).collect();
    for (index, value) in values_at.range(.. total_points) {
        if let Some(slot) = values.get_mut(*index) {
            *slot = *value;
            gaps.remove(index);
        }
    }
    let mut series = series(metric_name, labels, values, temporality);
    series.gaps = gaps;
    series
}

fn series(
    metric_name: &str,
    labels: &BTreeMap<String, String>,
    values: Vec<f64>,
    temporality: Temporality,
) -> MetricSeries {
    MetricSeries::new(metric_name, labels.clone(), values).with_temporality(temporality)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp, reason = "Test-only assertions.")]

    use super::*;

    fn labels() -> BTreeMap<String, String> {
        BTreeMap::from([("host".to_string(), "worker-1".to_string())])
    }

    #[test]
    fn counter_with_resets_drops_to_zero_at_reset_indices() {
        let series = counter_with_resets("requests_total", &labels(), 6, 10.0, &[3]);
        assert_eq!(series.values, vec![10.0, 20.0, 30.0, 0.0, 10.0, 20.0]);
        assert_eq!(series.temporality, Temporality::Cumulative);
        assert!(series.is_monotonic());
    }

    #[test]
    fn sparse_marks_missing_slots_as_gaps() {
        let values_at = BTreeMap::from([(1, 5.0), (3, 7.0), (9, 1.0)]);
        let series = sparse("queue_depth", &labels(), &values_at, 4, Temporality::Unspecified);
        assert_eq!(series.values.len(), 4);
        assert_eq!(series.gaps, BTreeSet::from([0, 2]));
        let points = series.expand(1_000_000).unwrap();
        let values: Vec<f64> = points.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![5.0, 7.0]);
        assert_eq!(points[1].timestamp_ms - points[0].timestamp_ms, 120_000);
    }

    #[test]
    fn non_monotonic_sum_overrides_flag() {
        let series = non_monotonic_sum("balance", &labels(), &[3.0, 1.0], Temporality::Delta);
        assert!(!series.is_monotonic());
        assert_eq!(series.temporality.metric_type(), "Sum");
    }

    #[test]
    fn gauge_is_not_monotonic() {
        let series = gauge("cpu", &labels(), &[1.0]);
        assert!(!series.is_monotonic());
        assert_eq!(series.temporality.metric_type(), "Gauge");
    }
}
