//! ---
//! wft_section: "15-testing-qa-runbook"
//! wft_subsection: "integration-tests"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "End-to-end tests for the wind farm twin workspace."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use tempfile::tempdir;
use wft_common::{LakeConfig, ScenarioConfig, TwinConfig};
use wft_persistence::PartitionedTable;
use wft_pipeline::list_runs;
use wft_schema::{
    CuratedRecord, FarmKpiRow, HourlyEnergyRow, TelemetryRecord, CURATED_PARTITION_COLUMNS,
    RAW_PARTITION_COLUMNS,
};
use wft_twinctl::{TierSelection, TwinRunner};

// 6 h at 60 s for 12 turbines, plus floor(0.002 * 4320) duplicates.
const CLEAN_ROWS_PER_RUN: usize = 6 * 60 * 12;
const RAW_ROWS_PER_RUN: usize = CLEAN_ROWS_PER_RUN + 8;

fn config(root: &Path, inject_issues: bool) -> TwinConfig {
    let mut config = TwinConfig::default();
    config.lake = LakeConfig::new(root.join("lake"));
    config.logging.directory = root.join("logs");
    config.generation.inject_issues = inject_issues;
    config.scenarios = vec![
        ScenarioConfig::new("SIM-A").with_wake_strength(0.12),
        ScenarioConfig::new("SIM-B").with_wake_strength(0.25),
    ];
    config.validate().expect("test config is valid");
    config
}

fn read<T: serde::de::DeserializeOwned>(root: impl AsRef<Path>, columns: &[&str]) -> Vec<T> {
    PartitionedTable::new(root.as_ref(), columns)
        .read_all::<T>()
        .expect("dataset readable")
        .into_iter()
        .map(|row| row.row)
        .collect()
}

#[test]
fn six_hour_two_scenario_run() -> Result<()> {
    let dir = tempdir()?;
    let runner = TwinRunner::new(config(dir.path(), true))?;
    let lake = runner.lake().clone();

    let report = runner.run()?;
    assert_eq!(report.simulations.len(), 2);
    for summary in &report.simulations {
        assert_eq!(summary.rows, RAW_ROWS_PER_RUN);
        assert_eq!(summary.injected.duplicates, 8);
    }
    assert_eq!(report.curation.rows_read, 2 * RAW_ROWS_PER_RUN);
    assert_eq!(report.curation.rows_written, 2 * CLEAN_ROWS_PER_RUN);
    assert_eq!(report.curation.duplicates_removed, 16);
    assert_eq!(report.curation.buckets_processed, 12);
    assert_eq!(report.rollups[0].rows_written, 2 * 72);
    assert_eq!(report.rollups[1].rows_written, 2 * 6);
    let expected: Vec<&str> = vec!["SIM-A", "SIM-B"];
    assert_eq!(report.bronze_runs.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    assert_eq!(report.gold_runs.iter().map(String::as_str).collect::<Vec<_>>(), expected);

    let raw: Vec<TelemetryRecord> = read(lake.bronze_root(), &RAW_PARTITION_COLUMNS);
    assert_eq!(raw.len(), 2 * RAW_ROWS_PER_RUN);

    let curated: Vec<CuratedRecord> = read(lake.silver_root(), &CURATED_PARTITION_COLUMNS);
    let mut keys = HashSet::new();
    for row in &curated {
        assert!(keys.insert((row.sim_run_id.clone(), row.event_time, row.turbine_id.clone())));
        assert!(!row.is_duplicate);
        if row.power_kw > 10_000.0 {
            assert!(row.has_range_violation);
        }
    }
    assert_eq!(list_runs(&lake.silver_root())?.len(), 2);

    let energy: Vec<HourlyEnergyRow> =
        read(lake.gold_root().join("hourly_energy"), &CURATED_PARTITION_COLUMNS);
    assert_eq!(energy.len(), 144);
    assert!(energy.iter().all(|row| row.rows == 60 && row.energy_kwh >= 0.0));

    let kpis: Vec<FarmKpiRow> = read(lake.gold_root().join("farm_kpis"), &CURATED_PARTITION_COLUMNS);
    assert_eq!(kpis.len(), 12);
    for row in &kpis {
        assert_eq!(row.n_turbines_est, 12);
        assert_eq!(row.total_rows, 720);
        assert!(row.capacity_factor.is_some_and(|cf| cf > 0.0 && cf <= 1.0));
        assert!((0.0..=1.0).contains(&row.availability));
    }

    // Stronger wake loses more wind on average.
    let mean_loss = |run: &str| {
        let rows: Vec<&FarmKpiRow> = kpis.iter().filter(|r| r.sim_run_id == run).collect();
        rows.iter().map(|r| r.avg_wake_loss_mps).sum::<f64>() / rows.len() as f64
    };
    assert!(mean_loss("SIM-B") > mean_loss("SIM-A"));
    Ok(())
}

#[test]
fn clean_run_keeps_capacity_factor_within_unit_interval() -> Result<()> {
    let dir = tempdir()?;
    let runner = TwinRunner::new(config(dir.path(), false))?;
    let report = runner.run()?;
    assert_eq!(report.curation.rows_written, 2 * CLEAN_ROWS_PER_RUN);
    assert_eq!(report.curation.duplicates_removed, 0);
    assert_eq!(report.curation.range_violations, 0);

    let kpis: Vec<FarmKpiRow> = read(
        runner.lake().gold_root().join("farm_kpis"),
        &CURATED_PARTITION_COLUMNS,
    );
    for row in kpis {
        let cf = row.capacity_factor.expect("capacity factor defined");
        assert!((0.0..=1.0).contains(&cf), "capacity factor {cf} out of range");
        assert_eq!(row.bad_rows, 0);
    }
    Ok(())
}

#[test]
fn rerun_is_idempotent_downstream_of_bronze() -> Result<()> {
    let dir = tempdir()?;
    let runner = TwinRunner::new(config(dir.path(), true))?;
    runner.run()?;

    let again = runner.run()?;
    assert_eq!(again.curation.rows_written, 0);
    assert!(again.rollups.iter().all(|outcome| outcome.rows_written == 0));

    let lake = runner.lake();
    let raw: Vec<TelemetryRecord> = read(lake.bronze_root(), &RAW_PARTITION_COLUMNS);
    assert_eq!(raw.len(), 4 * RAW_ROWS_PER_RUN);
    let curated: Vec<CuratedRecord> = read(lake.silver_root(), &CURATED_PARTITION_COLUMNS);
    assert_eq!(curated.len(), 2 * CLEAN_ROWS_PER_RUN);
    let energy: Vec<HourlyEnergyRow> =
        read(lake.gold_root().join("hourly_energy"), &CURATED_PARTITION_COLUMNS);
    assert_eq!(energy.len(), 144);

    runner.verify(TierSelection::Silver, &["SIM-A", "SIM-B"])?;
    assert!(runner.verify(TierSelection::Gold, &["SIM-C"]).is_err());
    Ok(())
}
