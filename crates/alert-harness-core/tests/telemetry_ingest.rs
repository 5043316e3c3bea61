// crates/alert-harness-core/tests/telemetry_ingest.rs
// ============================================================================
// Module: Telemetry Ingest Tests
// Description: Series expansion, row layout, and batch failure semantics.
// Purpose: Ensure planted rows match the store schema the SUT reads.
// ============================================================================

//! Telemetry ingestion tests against an in-memory sink.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use alert_harness_core::HarnessError;
use alert_harness_core::telemetry::MetricSeries;
use alert_harness_core::telemetry::MetricsSink;
use alert_harness_core::telemetry::RowBatch;
use alert_harness_core::telemetry::TelemetryIngestor;
use alert_harness_core::telemetry::Temporality;
use alert_harness_core::telemetry::build_rows;
use alert_harness_core::telemetry::fingerprint;
use alert_harness_core::telemetry::load_series_file;
use alert_harness_core::telemetry::parse_series_lines;
use async_trait::async_trait;

type TestResult = Result<(), String>;

const NOW_MS: i64 = 1_700_000_000_000;

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<RowBatch>>,
    fail: bool,
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn write(&self, batch: &RowBatch) -> alert_harness_core::Result<()> {
        if self.fail {
            return Err(HarnessError::Store("row rejected".to_string()));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    async fn truncate(&self) -> alert_harness_core::Result<()> {
        self.batches.lock().unwrap().clear();
        Ok(())
    }
}

fn cpu_series() -> MetricSeries {
    MetricSeries::new(
        "test_cpu_usage",
        [("host".to_string(), "worker-1".to_string()), ("env".to_string(), "prod".to_string())],
        vec![50.0, 50.0, 50.0, 90.0, 90.0, 50.0],
    )
}

#[test]
fn default_start_puts_every_point_before_now() -> TestResult {
    let points = cpu_series().expand(NOW_MS).map_err(|err| err.to_string())?;
    assert_eq!(points.len(), 6);
    assert_eq!(points[0].timestamp_ms, NOW_MS - 6 * 60_000);
    assert_eq!(points[5].timestamp_ms, NOW_MS - 60_000);
    assert!(points.windows(2).all(|pair| pair[1].timestamp_ms - pair[0].timestamp_ms == 60_000));
    assert!(points.iter().all(|point| point.timestamp_ms <= NOW_MS));
    Ok(())
}

#[test]
fn pinned_and_offset_starts_are_honored() {
    let pinned = cpu_series().starting_at(1_000).expand(NOW_MS).unwrap();
    assert_eq!(pinned[0].timestamp_ms, 1_000);

    let mut offset = cpu_series().with_interval_sec(30);
    offset.start_offset_sec = Some(-600);
    let points = offset.expand(NOW_MS).unwrap();
    assert_eq!(points[0].timestamp_ms, NOW_MS - 600_000);
    assert_eq!(points[1].timestamp_ms, NOW_MS - 570_000);
}

#[test]
fn zero_interval_and_non_finite_values_are_rejected() {
    let zero = cpu_series().with_interval_sec(0);
    assert!(matches!(zero.expand(NOW_MS), Err(HarnessError::InvalidInput(_))));

    let mut nan = cpu_series();
    nan.values[2] = f64::NAN;
    let err = nan.expand(NOW_MS).unwrap_err();
    assert!(err.to_string().contains("index 2"));
}

#[test]
fn rows_follow_store_layout() {
    let mut series = cpu_series().with_temporality(Temporality::Cumulative);
    series.labels.insert("deployment.environment".to_string(), "staging".to_string());
    let (batch, summary) = build_rows(&[series.clone()], NOW_MS).unwrap();

    assert_eq!(summary.series, 1);
    assert_eq!(summary.samples, 6);
    assert_eq!(summary.first_ms, Some(NOW_MS - 360_000));
    assert_eq!(summary.last_ms, Some(NOW_MS - 60_000));

    let mut labels = series.labels.clone();
    labels.insert("__name__".to_string(), "test_cpu_usage".to_string());
    let expected_hash = fingerprint(&labels).hash;

    assert!(batch.samples.iter().all(|row| row.fingerprint == expected_hash));
    assert!(batch.samples.iter().all(|row| row.env == "staging"));
    assert!(batch.samples.iter().all(|row| row.temporality == "Cumulative"));
    let values: Vec<f64> = batch.samples.iter().map(|row| row.value).collect();
    assert_eq!(values, vec![50.0, 50.0, 50.0, 90.0, 90.0, 50.0]);

    let first = &batch.series[0];
    assert_eq!(first.metric_type, "Sum");
    assert!(first.is_monotonic);
    assert_eq!(first.unix_milli % 3_600_000, 0);
    assert!(first.unix_milli <= NOW_MS - 360_000);
    let stored: BTreeMap<String, String> = serde_json::from_str(&first.labels).unwrap();
    assert_eq!(stored, labels);
}

#[test]
fn gauge_rows_default_env() {
    let (batch, _) = build_rows(&[cpu_series()], NOW_MS).unwrap();
    assert!(batch.series.iter().all(|row| row.env == "default"));
    assert!(batch.series.iter().all(|row| row.metric_type == "Gauge"));
    assert!(batch.series.iter().all(|row| !row.is_monotonic));
    assert!(batch.series.iter().all(|row| row.temporality == "Unspecified"));
}

#[test]
fn series_row_per_hour_bucket() {
    let series = MetricSeries::new("hourly", Vec::new(), vec![1.0; 3])
        .with_interval_sec(3600)
        .starting_at(7_200_000);
    let (batch, _) = build_rows(&[series], NOW_MS).unwrap();
    let buckets: Vec<i64> = batch.series.iter().map(|row| row.unix_milli).collect();
    assert_eq!(buckets, vec![7_200_000, 10_800_000, 14_400_000]);
}

#[tokio::test]
async fn ingest_writes_one_batch() {
    let sink = Arc::new(RecordingSink::default());
    let ingestor = TelemetryIngestor::new(sink.clone());
    let other = MetricSeries::new("test_mem_usage", Vec::new(), vec![1.0, 2.0]);
    let summary = ingestor.ingest(&[cpu_series(), other], NOW_MS).await.unwrap();
    assert_eq!(summary.samples, 8);
    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].samples.len(), 8);
}

#[tokio::test]
async fn failed_batch_fails_ingest() {
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..RecordingSink::default()
    });
    let ingestor = TelemetryIngestor::new(sink);
    let err = ingestor.ingest(&[cpu_series()], NOW_MS).await.unwrap_err();
    assert!(matches!(err, HarnessError::Store(_)));
}

#[test]
fn series_lines_parse_with_defaults() {
    let content = r#"
{"metric_name":"test_cpu_usage","labels":{"host":"worker-1"},"values":[10,20,30]}

{"metric_name":"requests_total","values":[1,2],"interval_sec":30,"temporality":"cumulative","start_offset_sec":-300}
"#;
    let series = parse_series_lines(content).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].interval_sec, 60);
    assert_eq!(series[0].temporality, Temporality::Unspecified);
    assert_eq!(series[1].temporality, Temporality::Cumulative);
    assert_eq!(series[1].start_offset_sec, Some(-300));
}

#[test]
fn series_lines_report_bad_line_number() {
    let content = "{\"metric_name\":\"ok\",\"values\":[1]}\n{\"metric_name\":\"bad\"}\n";
    let err = parse_series_lines(content).unwrap_err();
    assert!(err.to_string().contains("series line 2"), "{err}");
}

#[test]
fn series_file_loads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "{{\"metric_name\":\"disk\",\"values\":[1,2,3],\"temporality\":\"delta\"}}"
    )
    .unwrap();
    let series = load_series_file(file.path()).unwrap();
    assert_eq!(series[0].temporality, Temporality::Delta);
    assert_eq!(series[0].values, vec![1.0, 2.0, 3.0]);
}
