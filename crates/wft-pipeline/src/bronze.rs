//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use wft_logging::{log_stage_event, twin_debug, LogContext, StageOutcome};
use wft_persistence::PartitionedTable;
use wft_schema::{TelemetryRecord, RAW_PARTITION_COLUMNS};

use crate::metrics::PipelineMetrics;
use crate::{report_fault, PipelineError, Result, Stage};

/// Rows and files produced by one ingest call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReceipt {
    pub rows: usize,
    pub files: Vec<PathBuf>,
}

impl IngestReceipt {
    fn absorb(&mut self, other: IngestReceipt) {
        self.rows += other.rows;
        self.files.extend(other.files);
    }
}

/// Append-only writer for the raw tier, partitioned by run, farm, date and hour.
#[derive(Debug, Clone)]
pub struct RawIngest {
    table: PartitionedTable,
    metrics: Option<PipelineMetrics>,
}

impl RawIngest {
    pub fn new(bronze_root: impl Into<PathBuf>) -> Self {
        Self {
            table: PartitionedTable::new(bronze_root, &RAW_PARTITION_COLUMNS),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn root(&self) -> &Path {
        self.table.root()
    }

    /// Validate and persist one batch.
    ///
    /// Nothing is written unless every record carries its identity fields.
    pub fn ingest(&self, records: &[TelemetryRecord]) -> Result<IngestReceipt> {
        report_fault(
            Stage::Bronze,
            validate_batch(records).and_then(|()| self.write(records)),
        )
    }

    /// Split a batch by `(farm, hour)` and ingest each chunk on its own.
    ///
    /// Chunks are written in sorted key order and keep their input order.
    pub fn ingest_hourly(&self, records: &[TelemetryRecord]) -> Result<IngestReceipt> {
        report_fault(Stage::Bronze, self.write_hourly(records))
    }

    fn write(&self, records: &[TelemetryRecord]) -> Result<IngestReceipt> {
        let started = Instant::now();
        let normalized: Vec<TelemetryRecord> =
            records.iter().cloned().map(TelemetryRecord::normalized).collect();
        let files = self.table.write_batch(&normalized, |record| {
            vec![
                record.sim_run_id.clone(),
                record.farm_id.clone(),
                record.partition_date(),
                record.hour_key(),
            ]
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_rows_written(Stage::Bronze, normalized.len());
            metrics.observe_stage_duration(Stage::Bronze, started.elapsed().as_secs_f64());
        }
        let ctx = LogContext::new().with_stage(Stage::Bronze.as_str());
        twin_debug!(context = ctx, "ingested {} rows into {} files", normalized.len(), files.len());
        Ok(IngestReceipt {
            rows: normalized.len(),
            files,
        })
    }

    fn write_hourly(&self, records: &[TelemetryRecord]) -> Result<IngestReceipt> {
        validate_batch(records)?;
        let mut chunks: BTreeMap<(&str, String), Vec<TelemetryRecord>> = BTreeMap::new();
        for record in records {
            chunks
                .entry((record.farm_id.as_str(), record.hour_key()))
                .or_default()
                .push(record.clone());
        }

        let mut receipt = IngestReceipt::default();
        for chunk in chunks.values() {
            receipt.absorb(self.write(chunk)?);
        }
        let ctx = LogContext::new().with_stage(Stage::Bronze.as_str());
        log_stage_event(
            Some(&ctx),
            "bronze.ingested",
            &format!("{} rows in {} hourly chunks", receipt.rows, chunks.len()),
            StageOutcome::Processed,
        );
        Ok(receipt)
    }
}

fn validate_batch(records: &[TelemetryRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }
    for (index, record) in records.iter().enumerate() {
        for (field, value) in [
            ("farm_id", &record.farm_id),
            ("turbine_id", &record.turbine_id),
            ("sim_run_id", &record.sim_run_id),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::MissingField { field, index });
            }
        }
    }
    Ok(())
}
