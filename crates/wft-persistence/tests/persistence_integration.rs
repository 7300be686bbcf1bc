//! ---
//! wft_section: "15-testing-qa-runbook"
//! wft_subsection: "integration-tests"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Integration tests for partitioned tables and processed-key state files."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;
use wft_persistence::{PartitionedTable, ProcessedKeyStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct HourRow {
    sim_run_id: String,
    farm_id: String,
    hour_key: String,
    energy_kwh: f64,
    capacity_factor: Option<f64>,
}

fn row(run: &str, hour: &str, energy: f64, cf: Option<f64>) -> HourRow {
    HourRow {
        sim_run_id: run.into(),
        farm_id: "F001".into(),
        hour_key: hour.into(),
        energy_kwh: energy,
        capacity_factor: cf,
    }
}

#[test]
fn table_writes_and_key_store_track_the_same_buckets() -> Result<()> {
    let lake = tempdir()?;
    let table = PartitionedTable::new(lake.path().join("gold"), &["sim_run_id", "farm_id"]);
    let store = ProcessedKeyStore::new(lake.path().join("_state"));

    let batch = vec![
        row("SIM-A", "2026-01-05T00:00:00Z", 1200.5, Some(0.05)),
        row("SIM-B", "2026-01-05T00:00:00Z", 0.0, None),
    ];
    let mut processed = store.open("gold_processed_hours")?;
    let fresh: Vec<_> = batch
        .into_iter()
        .filter(|r| !processed.contains(&format!("{}|{}|{}", r.sim_run_id, r.farm_id, r.hour_key)))
        .collect();
    table.write_batch(&fresh, |r| vec![r.sim_run_id.clone(), r.farm_id.clone()])?;
    for r in &fresh {
        processed.insert(format!("{}|{}|{}", r.sim_run_id, r.farm_id, r.hour_key));
    }
    assert_eq!(processed.commit()?, 2);

    let back = table.read_all::<HourRow>()?;
    assert_eq!(back.len(), 2);
    assert_eq!(back[0].row.capacity_factor, Some(0.05));
    assert_eq!(back[1].row.capacity_factor, None);
    assert_eq!(back[1].partition("sim_run_id"), Some("SIM-B"));

    let reopened = store.open("gold_processed_hours")?;
    assert!(reopened.contains("SIM-A|F001|2026-01-05T00:00:00Z"));
    assert!(reopened.contains("SIM-B|F001|2026-01-05T00:00:00Z"));
    Ok(())
}

#[test]
fn distinct_partition_values_span_all_writes() -> Result<()> {
    let lake = tempdir()?;
    let table = PartitionedTable::new(lake.path(), &["sim_run_id", "farm_id"]);
    for run in ["SIM-B", "SIM-A", "SIM-B"] {
        table.write_batch(&[row(run, "2026-01-05T01:00:00Z", 5.0, None)], |r| {
            vec![r.sim_run_id.clone(), r.farm_id.clone()]
        })?;
    }
    let runs: Vec<_> = table.partition_values("sim_run_id")?.into_iter().collect();
    assert_eq!(runs, vec!["SIM-A", "SIM-B"]);
    assert_eq!(table.files()?.len(), 3);
    assert!(table.partition_values("hour")?.is_empty());
    Ok(())
}
