//! ---
//! wft_section: "05-operations"
//! wft_subsection: "library"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Scenario runner shared by the control CLI and end-to-end tests."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use prometheus::Registry;
use tracing::info;
use wft_common::{LakeConfig, TwinConfig};
use wft_logging::{log_stage_event, LogContext, StageOutcome};
use wft_pipeline::{
    ensure_runs_present, AggregationStage, CurationOutcome, CurationStage, PipelineMetrics,
    RawIngest, RollupOutcome,
};

use crate::scenario::{generate_scenario, select_scenarios, SimulationSummary};

/// Which Gold rollups an aggregation pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RollupSelection {
    Energy,
    Kpis,
    All,
}

/// Tier inspected by a verification query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierSelection {
    Bronze,
    Silver,
    Gold,
}

/// Everything a full `run` produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub simulations: Vec<SimulationSummary>,
    pub curation: CurationOutcome,
    pub rollups: Vec<RollupOutcome>,
    pub bronze_runs: BTreeSet<String>,
    pub gold_runs: BTreeSet<String>,
}

/// Drives every stage against the lake described by a [`TwinConfig`].
pub struct TwinRunner {
    config: TwinConfig,
    metrics: PipelineMetrics,
}

impl TwinRunner {
    pub fn new(config: TwinConfig) -> Result<Self> {
        let metrics = PipelineMetrics::new(Arc::new(Registry::new()))?;
        Ok(Self { config, metrics })
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    pub fn lake(&self) -> &LakeConfig {
        &self.config.lake
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    fn ingest(&self) -> RawIngest {
        RawIngest::new(self.lake().bronze_root()).with_metrics(self.metrics.clone())
    }

    fn curation(&self) -> CurationStage {
        let lake = self.lake();
        CurationStage::new(lake.bronze_root(), lake.silver_root(), lake.state_root())
            .with_quality(self.config.quality)
            .with_metrics(self.metrics.clone())
    }

    fn aggregation(&self) -> AggregationStage {
        let lake = self.lake();
        AggregationStage::new(lake.silver_root(), lake.gold_root(), lake.state_root())
            .with_config(&self.config.aggregation, self.config.aggregation_rated_power_kw())
            .with_metrics(self.metrics.clone())
    }

    /// Generate each selected scenario and append it to Bronze in hourly chunks.
    pub fn simulate(&self, only: Option<&str>) -> Result<Vec<SimulationSummary>> {
        let ingest = self.ingest();
        let mut summaries = Vec::new();
        for scenario in select_scenarios(&self.config, only)? {
            let batch = generate_scenario(&self.config, scenario)?;
            let receipt = ingest.ingest_hourly(&batch.records)?;
            info!(
                sim_run_id = %scenario.sim_run_id,
                rows = receipt.rows,
                files = receipt.files.len(),
                duplicates = batch.injected.duplicates,
                "scenario ingested"
            );
            summaries.push(SimulationSummary {
                sim_run_id: scenario.sim_run_id.clone(),
                rows: receipt.rows,
                injected: batch.injected,
                files: receipt.files,
            });
        }
        Ok(summaries)
    }

    pub fn curate(&self) -> Result<CurationOutcome> {
        Ok(self.curation().run()?)
    }

    pub fn aggregate(&self, selection: RollupSelection) -> Result<Vec<RollupOutcome>> {
        let stage = self.aggregation();
        let mut outcomes = Vec::with_capacity(2);
        if matches!(selection, RollupSelection::Energy | RollupSelection::All) {
            outcomes.push(stage.run_hourly_energy()?);
        }
        if matches!(selection, RollupSelection::Kpis | RollupSelection::All) {
            outcomes.push(stage.run_farm_kpis()?);
        }
        Ok(outcomes)
    }

    /// Dataset roots a tier is made of. Gold holds one dataset per rollup.
    pub fn tier_datasets(&self, tier: TierSelection) -> Vec<PathBuf> {
        match tier {
            TierSelection::Bronze => vec![self.lake().bronze_root()],
            TierSelection::Silver => vec![self.lake().silver_root()],
            TierSelection::Gold => {
                let stage = self.aggregation();
                vec![
                    stage.hourly_energy_location().to_path_buf(),
                    stage.farm_kpis_location().to_path_buf(),
                ]
            }
        }
    }

    /// Fail unless every dataset of `tier` holds all `expected` runs.
    ///
    /// Returns the runs present in every dataset of the tier.
    pub fn verify<S: AsRef<str>>(&self, tier: TierSelection, expected: &[S]) -> Result<BTreeSet<String>> {
        let mut common: Option<BTreeSet<String>> = None;
        for dataset in self.tier_datasets(tier) {
            let found = ensure_runs_present(&dataset, expected)?;
            common = Some(match common {
                None => found,
                Some(seen) => seen.intersection(&found).cloned().collect(),
            });
        }
        Ok(common.unwrap_or_default())
    }

    /// Simulate every scenario, curate, aggregate both rollups and check that
    /// Bronze and Gold contain every configured run.
    pub fn run(&self) -> Result<RunReport> {
        let expected = self.config.run_ids();
        let ctx = LogContext::new().with_stage("run");
        let simulations = self.simulate(None)?;
        let curation = self.curate()?;
        let rollups = self.aggregate(RollupSelection::All)?;
        let bronze_runs = self.verify(TierSelection::Bronze, &expected)?;
        let gold_runs = self.verify(TierSelection::Gold, &expected)?;
        log_stage_event(
            Some(&ctx),
            "run.finished",
            &format!("{} runs present in bronze and gold", expected.len()),
            StageOutcome::Processed,
        );
        Ok(RunReport {
            simulations,
            curation,
            rollups,
            bronze_runs,
            gold_runs,
        })
    }
}
