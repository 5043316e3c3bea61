// crates/alert-harness-core/src/telemetry/mod.rs
// ============================================================================
// Module: Telemetry
// Description: Metric series, fingerprints, generators, and store ingestion.
// Purpose: Plant synthetic telemetry the rule engine will evaluate.
// Dependencies: clickhouse, serde_json, time
// ============================================================================

pub mod fingerprint;
pub mod generators;
pub mod ingest;
pub mod series;
pub mod store;

pub use fingerprint::Fingerprint;
pub use fingerprint::fingerprint;
pub use fingerprint::fingerprint_hash;
pub use fingerprint::fingerprint_pairs;
pub use ingest::IngestSummary;
pub use ingest::TelemetryIngestor;
pub use ingest::build_rows;
pub use series::MetricPoint;
pub use series::MetricSeries;
pub use series::Temporality;
pub use series::load_series_file;
pub use series::now_millis;
pub use series::parse_series_lines;
pub use store::ClickHouseSink;
pub use store::MetricsSink;
pub use store::RowBatch;
pub use store::SampleRow;
pub use store::TimeSeriesRow;
