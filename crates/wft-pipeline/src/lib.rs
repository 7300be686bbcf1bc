//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
//! Bronze, Silver and Gold stages of the telemetry lake.
//!
//! Each stage receives its roots explicitly. Curation and aggregation are
//! idempotent per `(run, farm, hour)` bucket: a bucket recorded in the
//! stage's processed-key set is never written again, and the set only grows
//! after the corresponding table write succeeded.

use std::path::PathBuf;

use wft_logging::{log_stage_event, LogContext, StageOutcome};
use wft_persistence::PersistenceError;

pub mod bronze;
pub mod gold;
pub mod metrics;
pub mod silver;
pub mod validation;
pub mod verify;

pub use bronze::{IngestReceipt, RawIngest};
pub use gold::{AggregationStage, RollupOutcome, FARM_KPIS_STATE, HOURLY_ENERGY_STATE};
pub use metrics::PipelineMetrics;
pub use silver::{CurationOutcome, CurationStage, SILVER_STATE};
pub use validation::{RangeCheck, RangeValidator};
pub use verify::{ensure_runs_present, list_runs};

/// Result alias used throughout the pipeline crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures surfaced by pipeline stages.
///
/// Data-quality defects are never errors; they are flagged in the curated rows.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("input batch is empty")]
    EmptyBatch,
    #[error("record {index} has an empty {field}")]
    MissingField { field: &'static str, index: usize },
    #[error("upstream dataset not found: {path}")]
    MissingUpstream { path: PathBuf },
    #[error("upstream dataset {path} holds no rows")]
    EmptyUpstream { path: PathBuf },
    #[error("{tier} is missing runs {missing:?} (found {found:?})")]
    MissingRuns {
        tier: String,
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Pipeline stage label used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Bronze,
    Silver,
    GoldEnergy,
    GoldKpis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Bronze => "bronze",
            Stage::Silver => "silver",
            Stage::GoldEnergy => "gold_hourly_energy",
            Stage::GoldKpis => "gold_farm_kpis",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log a `Fault` event for a failed stage and hand the result back unchanged.
pub(crate) fn report_fault<T>(stage: Stage, result: Result<T>) -> Result<T> {
    result.inspect_err(|err| {
        let ctx = LogContext::new().with_stage(stage.as_str());
        log_stage_event(
            Some(&ctx),
            &format!("{stage}.failed"),
            &err.to_string(),
            StageOutcome::Fault,
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_report_passes_the_error_through() {
        let failed: Result<()> = Err(PipelineError::EmptyBatch);
        assert!(matches!(
            report_fault(Stage::Bronze, failed),
            Err(PipelineError::EmptyBatch)
        ));
        assert_eq!(report_fault(Stage::Silver, Ok(7)).unwrap(), 7);
    }

    #[test]
    fn stage_labels_match_metric_values() {
        assert_eq!(Stage::GoldEnergy.to_string(), "gold_hourly_energy");
        assert_eq!(Stage::GoldKpis.as_str(), "gold_farm_kpis");
    }
}
