// system-tests/tests/helpers/scenarios.rs
// ============================================================================
// Module: Seed Scenarios
// Description: Alert test cases covering compare operators and match types.
// Purpose: Build the end-to-end threshold cases from typed rule specs.
// Dependencies: alert-harness-core
// ============================================================================

//! ## Overview
//! Every case plants one `test_cpu_usage` series sampled once a minute and
//! ending at injection time, then installs a five-minute threshold rule that
//! evaluates every minute.

use std::collections::BTreeMap;

use alert_harness_core::AlertExpectations;
use alert_harness_core::AlertTestCase;
use alert_harness_core::CompareOp;
use alert_harness_core::ExpectedAlert;
use alert_harness_core::MatchType;
use alert_harness_core::MetricSeries;
use alert_harness_core::RuleSource;
use alert_harness_core::RuleSpec;
use alert_harness_core::Temporality;
use alert_harness_core::rule::Aggregation;
use alert_harness_core::rule::AggregationOp;
use alert_harness_core::rule::Threshold;

/// Metric every scenario writes.
pub const CPU_METRIC: &str = "test_cpu_usage";
/// Upper bound for a firing case; rule evaluation plus notifier grouping.
pub const FIRE_WAIT_SEC: u64 = 600;
/// Window a silent case must stay quiet for.
pub const SILENCE_WAIT_SEC: u64 = 180;

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

fn cpu_series(values: &[f64]) -> MetricSeries {
    MetricSeries::new(CPU_METRIC, pairs(&[("host", "worker-1"), ("env", "prod")]), values.to_vec())
        .with_interval_sec(60)
        .with_temporality(Temporality::Unspecified)
}

fn threshold(label: &str, value: f64, compare_op: CompareOp, match_type: MatchType) -> Threshold {
    Threshold {
        label: label.to_string(),
        value,
        compare_op,
        match_type,
        recovery_value: None,
        unit: String::new(),
    }
}

fn rule(alert_name: &str, op: AggregationOp, thresholds: Vec<Threshold>) -> RuleSpec {
    RuleSpec {
        alert_name: alert_name.to_string(),
        description: format!("{alert_name} seed scenario"),
        eval_window_sec: 300,
        frequency_sec: 60,
        aggregation: Aggregation {
            op,
            metric_name: CPU_METRIC.to_string(),
            temporality: Temporality::Unspecified,
            time_aggregation: None,
            group_by: vec!["host".to_string()],
            filter: None,
        },
        thresholds,
        preferred_channels: Vec::new(),
        labels: pairs(&[("severity", "critical")]),
        annotations: BTreeMap::new(),
    }
}

fn firing(alert_name: &str, threshold_name: &str, verify: &[(&str, &str)]) -> AlertExpectations {
    let mut expectations = AlertExpectations::firing(1, pairs(verify)).with_wait_sec(FIRE_WAIT_SEC);
    expectations.expected_alerts = vec![ExpectedAlert {
        labels: pairs(&[("alertname", alert_name), ("threshold.name", threshold_name)]),
        annotations: BTreeMap::new(),
    }];
    expectations
}

fn case(spec: RuleSpec, values: &[f64], expectations: AlertExpectations) -> AlertTestCase {
    let name = format!("test_{}", spec.alert_name);
    AlertTestCase::new(
        name,
        RuleSource::Spec {
            spec,
        },
        vec![cpu_series(values)],
        expectations,
    )
}

/// A spike above the threshold fires an at-least-once rule.
pub fn above_at_least_once() -> AlertTestCase {
    let name = "threshold_above_at_least_once";
    let spec = rule(
        name,
        AggregationOp::Max,
        vec![threshold("critical", 80.0, CompareOp::Above, MatchType::AtLeastOnce)],
    );
    let expectations = firing(name, "critical", &[("severity", "critical")]);
    case(spec, &[50.0, 50.0, 50.0, 90.0, 90.0, 50.0], expectations)
}

/// A single dip keeps an all-the-time rule silent.
pub fn above_all_the_time_silent() -> AlertTestCase {
    let spec = rule(
        "threshold_above_all_the_time_dip",
        AggregationOp::Max,
        vec![threshold("critical", 80.0, CompareOp::Above, MatchType::AllTheTime)],
    );
    let expectations = AlertExpectations::silent().with_wait_sec(SILENCE_WAIT_SEC);
    case(spec, &[90.0, 90.0, 90.0, 50.0, 90.0, 90.0], expectations)
}

/// A window mean below the threshold fires an on-average rule.
pub fn below_on_average() -> AlertTestCase {
    let name = "threshold_below_average";
    let spec = rule(
        name,
        AggregationOp::Avg,
        vec![threshold("critical", 40.0, CompareOp::Below, MatchType::OnAverage)],
    );
    case(spec, &[10.0, 20.0, 30.0, 40.0, 50.0], firing(name, "critical", &[]))
}

/// Values between the two levels fire only the warning level.
pub fn multi_threshold_warning() -> AlertTestCase {
    let name = "multi_threshold_warning";
    let spec = rule(
        name,
        AggregationOp::Max,
        vec![
            threshold("critical", 90.0, CompareOp::Above, MatchType::AtLeastOnce),
            threshold("warning", 70.0, CompareOp::Above, MatchType::AtLeastOnce),
        ],
    );
    let values: Vec<f64> = (75 ..= 80).map(f64::from).collect();
    let expectations = firing(name, "warning", &[("threshold.name", "warning")]);
    case(spec, &values, expectations)
}

/// The last sample equal to the target fires a last-value rule.
pub fn equal_to_last() -> AlertTestCase {
    let name = "threshold_equal_to_last";
    let spec = rule(
        name,
        AggregationOp::Max,
        vec![threshold("critical", 50.0, CompareOp::EqualTo, MatchType::Last)],
    );
    case(spec, &[10.0, 20.0, 30.0, 40.0, 50.0], firing(name, "critical", &[]))
}

/// A window sum above the threshold fires an in-total rule.
pub fn above_in_total() -> AlertTestCase {
    let name = "threshold_above_in_total";
    let spec = rule(
        name,
        AggregationOp::Sum,
        vec![threshold("critical", 100.0, CompareOp::Above, MatchType::InTotal)],
    );
    case(spec, &[10.0, 20.0, 30.0, 40.0, 50.0], firing(name, "critical", &[]))
}

/// The firing seed scenarios.
pub fn firing_cases() -> Vec<AlertTestCase> {
    vec![
        above_at_least_once(),
        below_on_average(),
        multi_threshold_warning(),
        equal_to_last(),
        above_in_total(),
    ]
}
