//! ---
//! wft_section: "05-operations"
//! wft_subsection: "library"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Scenario runner shared by the control CLI and end-to-end tests."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use wft_common::{ScenarioConfig, TwinConfig};
use wft_sim::{
    GeneratedTelemetry, GenerationRequest, InjectionReport, PowerCurve, ScenarioRngs,
    TelemetryGenerator, WindFarm,
};

/// What one simulated scenario contributed to Bronze.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub sim_run_id: String,
    pub rows: usize,
    pub injected: InjectionReport,
    pub files: Vec<PathBuf>,
}

/// Scenarios to simulate: all of them, or the single one named by `only`.
pub fn select_scenarios<'a>(
    config: &'a TwinConfig,
    only: Option<&str>,
) -> Result<Vec<&'a ScenarioConfig>> {
    match only {
        None => Ok(config.scenarios.iter().collect()),
        Some(id) => config
            .scenario(id)
            .map(|scenario| vec![scenario])
            .ok_or_else(|| {
                anyhow!(
                    "scenario '{}' is not configured (known: {})",
                    id,
                    config.run_ids().join(", ")
                )
            }),
    }
}

/// Generate one scenario's telemetry from its own seeds.
pub fn generate_scenario(config: &TwinConfig, scenario: &ScenarioConfig) -> Result<GeneratedTelemetry> {
    let generator = TelemetryGenerator::for_scenario(
        WindFarm::grid(&config.farm),
        PowerCurve::new(config.power_curve)?,
        scenario,
        &config.generation.source,
    )?;
    let request = GenerationRequest::from_config(&config.generation);
    generator
        .generate(&mut ScenarioRngs::for_scenario(scenario), &request)
        .with_context(|| format!("failed to simulate scenario '{}'", scenario.sim_run_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_scenarios() -> TwinConfig {
        let mut config = TwinConfig::default();
        config.generation.duration_hours = 1.0;
        config.scenarios = vec![
            ScenarioConfig::new("SIM-A").with_wake_strength(0.12),
            ScenarioConfig::new("SIM-B").with_wake_strength(0.25),
        ];
        config
    }

    #[test]
    fn selects_all_or_one() {
        let config = two_scenarios();
        assert_eq!(select_scenarios(&config, None).unwrap().len(), 2);
        let only = select_scenarios(&config, Some("SIM-B")).unwrap();
        assert_eq!(only[0].sim_run_id, "SIM-B");
        assert!(select_scenarios(&config, Some("SIM-Z")).is_err());
    }

    #[test]
    fn scenarios_share_wind_but_differ_in_wake() {
        let config = two_scenarios();
        let a = generate_scenario(&config, &config.scenarios[0]).unwrap();
        let b = generate_scenario(&config, &config.scenarios[1]).unwrap();
        assert_eq!(a.records.len(), b.records.len());
        assert_eq!(a.records[0].wind_speed_free_mps, b.records[0].wind_speed_free_mps);
        assert!(a.records.iter().all(|r| r.sim_run_id == "SIM-A"));
    }
}
