//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use wft_common::config::QualityConfig;
use wft_logging::{log_stage_event, twin_info, LogContext, StageOutcome};
use wft_persistence::{PartitionedTable, ProcessedKeyStore};
use wft_schema::{CuratedRecord, TelemetryRecord, CURATED_PARTITION_COLUMNS, RAW_PARTITION_COLUMNS};

use crate::metrics::PipelineMetrics;
use crate::validation::RangeValidator;
use crate::{report_fault, PipelineError, Result, Stage};

/// Processed-key set owned by the curation stage.
pub const SILVER_STATE: &str = "silver_processed_hours";

/// Summary of one curation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurationOutcome {
    /// Root of the curated dataset, returned even when nothing was written.
    pub location: PathBuf,
    pub buckets_processed: usize,
    /// Raw rows belonging to unprocessed buckets.
    pub rows_read: usize,
    pub rows_written: usize,
    pub duplicates_removed: usize,
    pub range_violations: usize,
    pub files: Vec<PathBuf>,
}

impl CurationOutcome {
    fn no_new_work(location: PathBuf) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }
}

/// Deduplicates and range-checks raw telemetry into the curated tier.
#[derive(Debug, Clone)]
pub struct CurationStage {
    raw: PartitionedTable,
    curated: PartitionedTable,
    state: ProcessedKeyStore,
    validator: RangeValidator,
    metrics: Option<PipelineMetrics>,
}

impl CurationStage {
    pub fn new(
        bronze_root: impl Into<PathBuf>,
        silver_root: impl Into<PathBuf>,
        state_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            raw: PartitionedTable::new(bronze_root, &RAW_PARTITION_COLUMNS),
            curated: PartitionedTable::new(silver_root, &CURATED_PARTITION_COLUMNS),
            state: ProcessedKeyStore::new(state_root),
            validator: RangeValidator::default(),
            metrics: None,
        }
    }

    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.validator = RangeValidator::new(quality);
        self
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn location(&self) -> &Path {
        self.curated.root()
    }

    /// Curate every raw bucket not yet recorded in [`SILVER_STATE`].
    pub fn run(&self) -> Result<CurationOutcome> {
        report_fault(Stage::Silver, self.curate())
    }

    fn curate(&self) -> Result<CurationOutcome> {
        let started = Instant::now();
        let ctx = LogContext::new().with_stage(Stage::Silver.as_str());
        if !self.raw.exists() {
            return Err(PipelineError::MissingUpstream {
                path: self.raw.root().to_path_buf(),
            });
        }

        let raw: Vec<TelemetryRecord> = self
            .raw
            .read_all::<TelemetryRecord>()?
            .into_iter()
            .map(|row| row.row.normalized())
            .collect();
        if raw.is_empty() {
            return Err(PipelineError::EmptyUpstream {
                path: self.raw.root().to_path_buf(),
            });
        }

        let mut processed = self.state.open(SILVER_STATE)?;
        let mut candidates: Vec<TelemetryRecord> = raw
            .into_iter()
            .filter(|record| !processed.contains(&record.bucket_key().to_string()))
            .collect();
        if candidates.is_empty() {
            log_stage_event(
                Some(&ctx),
                "silver.skipped",
                "no new hours to process",
                StageOutcome::NoNewWork,
            );
            return Ok(CurationOutcome::no_new_work(self.location().to_path_buf()));
        }

        let rows_read = candidates.len();
        let buckets: BTreeSet<String> = candidates
            .iter()
            .map(|record| record.bucket_key().to_string())
            .collect();

        // Stable: equal keys keep arrival order, so the earliest copy survives.
        candidates.sort_by(|a, b| a.dedup_key().cmp(&b.dedup_key()));
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut curated = Vec::with_capacity(candidates.len());
        let mut duplicates_removed = 0;
        let mut range_violations = 0;
        for record in candidates {
            let (event_time, farm_id, turbine_id) = record.dedup_key();
            let key = (
                record.sim_run_id.clone(),
                event_time,
                farm_id.to_owned(),
                turbine_id.to_owned(),
            );
            if !seen.insert(key) {
                duplicates_removed += 1;
                continue;
            }
            let check = self.validator.check(&record);
            if !check.is_clean() {
                range_violations += 1;
            }
            curated.push(CuratedRecord::from_telemetry(record, false, check.fields()));
        }

        let files = self.curated.write_batch(&curated, |row| {
            vec![row.sim_run_id.clone(), row.farm_id.clone(), row.partition_date()]
        })?;

        for bucket in &buckets {
            processed.insert(bucket.clone());
        }
        let buckets_processed = processed.commit()?;

        let outcome = CurationOutcome {
            location: self.location().to_path_buf(),
            buckets_processed,
            rows_read,
            rows_written: curated.len(),
            duplicates_removed,
            range_violations,
            files,
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_rows_read(Stage::Silver, outcome.rows_read);
            metrics.record_rows_written(Stage::Silver, outcome.rows_written);
            metrics.record_buckets(Stage::Silver, outcome.buckets_processed);
            metrics.record_duplicates(outcome.duplicates_removed);
            metrics.record_violations(outcome.range_violations);
            metrics.observe_stage_duration(Stage::Silver, started.elapsed().as_secs_f64());
        }
        twin_info!(
            context = ctx,
            "curated {} of {} rows ({} duplicates, {} flagged)",
            outcome.rows_written,
            outcome.rows_read,
            outcome.duplicates_removed,
            outcome.range_violations
        );
        log_stage_event(
            Some(&ctx),
            "silver.completed",
            &format!("{} buckets recorded", outcome.buckets_processed),
            StageOutcome::Processed,
        );
        Ok(outcome)
    }
}
