//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Simulation runtime helpers and scenario engines."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use wft_common::config::FarmLayoutConfig;

/// A turbine at a fixed planar position.
#[derive(Debug, Clone, PartialEq)]
pub struct Turbine {
    pub turbine_id: String,
    pub x_m: f64,
    pub y_m: f64,
    pub rated_power_kw: f64,
}

impl Turbine {
    pub fn new(turbine_id: impl Into<String>, x_m: f64, y_m: f64, rated_power_kw: f64) -> Self {
        Self {
            turbine_id: turbine_id.into(),
            x_m,
            y_m,
            rated_power_kw,
        }
    }
}

/// Immutable farm topology for the lifetime of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct WindFarm {
    farm_id: String,
    turbines: Vec<Turbine>,
}

impl WindFarm {
    pub fn new(farm_id: impl Into<String>, turbines: Vec<Turbine>) -> Self {
        Self {
            farm_id: farm_id.into(),
            turbines,
        }
    }

    /// Row-major rectangular grid; turbine ids run `T001`, `T002`, ...
    pub fn grid(config: &FarmLayoutConfig) -> Self {
        let mut turbines = Vec::with_capacity(config.rows * config.cols);
        for row in 0..config.rows {
            for col in 0..config.cols {
                let k = turbines.len() + 1;
                turbines.push(Turbine::new(
                    format!("T{k:03}"),
                    col as f64 * config.spacing_m,
                    row as f64 * config.spacing_m,
                    config.rated_power_kw,
                ));
            }
        }
        Self::new(config.farm_id.clone(), turbines)
    }

    pub fn farm_id(&self) -> &str {
        &self.farm_id
    }

    pub fn turbines(&self) -> &[Turbine] {
        &self.turbines
    }

    pub fn len(&self) -> usize {
        self.turbines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turbines.is_empty()
    }
}
