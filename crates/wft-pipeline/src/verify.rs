//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::path::Path;

use tracing::info;
use wft_persistence::PartitionedTable;

use crate::{PipelineError, Result};

const RUN_COLUMN: &str = "sim_run_id";

/// Distinct `sim_run_id` partition values under a dataset root.
pub fn list_runs(dataset_root: &Path) -> Result<BTreeSet<String>> {
    let table = PartitionedTable::new(dataset_root, &[]);
    if !table.exists() {
        return Err(PipelineError::MissingUpstream {
            path: dataset_root.to_path_buf(),
        });
    }
    Ok(table.partition_values(RUN_COLUMN)?)
}

/// Fail unless every `expected` run has data under `dataset_root`.
pub fn ensure_runs_present<S: AsRef<str>>(dataset_root: &Path, expected: &[S]) -> Result<BTreeSet<String>> {
    let found = list_runs(dataset_root)?;
    let missing: Vec<String> = expected
        .iter()
        .map(|run| run.as_ref())
        .filter(|run| !found.contains(*run))
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingRuns {
            tier: dataset_root.display().to_string(),
            missing,
            found: found.into_iter().collect(),
        });
    }
    info!(dataset = %dataset_root.display(), runs = ?found, "expected runs present");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(root: &Path, run: &str) {
        let dir = root.join(format!("sim_run_id={run}")).join("farm_id=F001");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("part-0001.csv"), "x\n1\n").unwrap();
    }

    #[test]
    fn missing_dataset_is_reported() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            list_runs(&dir.path().join("gold")),
            Err(PipelineError::MissingUpstream { .. })
        ));
    }

    #[test]
    fn lists_and_checks_runs() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "SIM-B");
        touch(dir.path(), "SIM-A");

        let runs = list_runs(dir.path()).unwrap();
        assert_eq!(runs.iter().cloned().collect::<Vec<_>>(), vec!["SIM-A", "SIM-B"]);
        assert!(ensure_runs_present(dir.path(), &["SIM-A", "SIM-B"]).is_ok());

        match ensure_runs_present(dir.path(), &["SIM-A", "SIM-C"]) {
            Err(PipelineError::MissingRuns { missing, found, .. }) => {
                assert_eq!(missing, vec!["SIM-C".to_string()]);
                assert_eq!(found, vec!["SIM-A".to_string(), "SIM-B".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
