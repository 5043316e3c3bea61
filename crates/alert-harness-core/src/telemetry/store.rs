// crates/alert-harness-core/src/telemetry/store.rs
// ============================================================================
// Module: Telemetry Store Sink
// Description: Metric rows and the sink that writes them to the store.
// Purpose: Plant samples directly in the metrics tables, bypassing the SUT.
// Dependencies: async-trait, clickhouse, serde
// ============================================================================

//! ## Overview
//! [`MetricsSink`] accepts one [`RowBatch`] at a time. [`ClickHouseSink`]
//! writes it over the store's HTTP interface: the series rows first, then the
//! samples. A failed row fails the whole batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use alert_harness_config::TelemetryStoreConfig;
use async_trait::async_trait;
use clickhouse::Client;
use clickhouse::Row;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::error::HarnessError;
use crate::error::Result;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Table receiving one row per sample.
pub const SAMPLES_TABLE: &str = "distributed_samples_v4";
/// Table receiving one row per series and hour.
pub const TIME_SERIES_TABLE: &str = "distributed_time_series_v4";
/// Local tables cleared by [`MetricsSink::truncate`].
const LOCAL_TABLES: [&str; 2] = ["samples_v4", "time_series_v4"];

// ============================================================================
// SECTION: Rows
// ============================================================================

/// One sample row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Row)]
pub struct SampleRow {
    /// Deployment environment.
    pub env: String,
    /// Temporality spelling.
    pub temporality: String,
    /// Metric name.
    pub metric_name: String,
    /// Series fingerprint.
    pub fingerprint: u64,
    /// Sample time in milliseconds.
    pub unix_milli: i64,
    /// Sample value.
    pub value: f64,
}

/// One series row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Row)]
pub struct TimeSeriesRow {
    /// Deployment environment.
    pub env: String,
    /// Temporality spelling.
    pub temporality: String,
    /// Metric name.
    pub metric_name: String,
    /// Metric description.
    pub description: String,
    /// Metric unit.
    pub unit: String,
    /// `Gauge` or `Sum`.
    #[serde(rename = "type")]
    pub metric_type: String,
    /// Monotonic flag.
    pub is_monotonic: bool,
    /// Series fingerprint.
    pub fingerprint: u64,
    /// Hour bucket in milliseconds.
    pub unix_milli: i64,
    /// Compact JSON label set including `__name__`.
    pub labels: String,
    /// Whether labels were normalized by the collector.
    #[serde(rename = "__normalized")]
    pub normalized: bool,
}

/// Rows written together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    /// Series rows.
    pub series: Vec<TimeSeriesRow>,
    /// Sample rows, ordered by time within each series.
    pub samples: Vec<SampleRow>,
}

impl RowBatch {
    /// Returns true when the batch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Destination of planted telemetry.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Writes a batch; returns only once the store acknowledged every row.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Store`] when any row is rejected.
    async fn write(&self, batch: &RowBatch) -> Result<()>;

    /// Removes every row the sink may have written.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Store`] when the store rejects the statement.
    async fn truncate(&self) -> Result<()>;
}

/// Sink writing to the store's HTTP interface.
pub struct ClickHouseSink {
    /// Store client bound to the metrics database.
    client: Client,
    /// Database name, used for truncation.
    database: String,
}

impl ClickHouseSink {
    /// Connects to the store at `url` with the configured credentials.
    #[must_use]
    pub fn new(url: &str, config: &TelemetryStoreConfig) -> Self {
        let client = Client::default()
            .with_url(url)
            .with_user(&config.user)
            .with_password(&config.password)
            .with_database(&config.database);
        Self {
            client,
            database: config.database.clone(),
        }
    }

    async fn insert_rows<T>(&self, table: &str, rows: &[T]) -> Result<()>
    where
        T: Row + Serialize,
    {
        if rows.is_empty() {
            return Ok(());
        }
        let mut insert = self.client.insert::<T>(table).map_err(|err| store_error(table, &err))?;
        for row in rows {
            insert.write(row).await.map_err(|err| store_error(table, &err))?;
        }
        insert.end().await.map_err(|err| store_error(table, &err))?;
        debug!(table, rows = rows.len(), "rows inserted");
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for ClickHouseSink {
    async fn write(&self, batch: &RowBatch) -> Result<()> {
        self.insert_rows(TIME_SERIES_TABLE, &batch.series).await?;
        self.insert_rows(SAMPLES_TABLE, &batch.samples).await
    }

    async fn truncate(&self) -> Result<()> {
        for table in LOCAL_TABLES {
            let statement = format!("TRUNCATE TABLE IF EXISTS {}.{table}", self.database);
            self.client
                .query(&statement)
                .execute()
                .await
                .map_err(|err| store_error(table, &err))?;
        }
        info!(database = %self.database, "metric tables truncated");
        Ok(())
    }
}

fn store_error(table: &str, err: &clickhouse::error::Error) -> HarnessError {
    HarnessError::Store(format!("{table}: {err}"))
}
