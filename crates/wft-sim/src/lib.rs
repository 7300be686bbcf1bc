//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "01-bootstrap"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Simulation runtime module exports and shared types."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
//! Physical simulation engine for the wind farm twin.
//!
//! The pieces compose leaf-first: [`WindField`] gives free-stream wind at a
//! turbine, [`WakeModel`] attenuates it by upstream wakes, [`PowerCurve`] maps
//! the effective speed to output, and [`TelemetryGenerator`] drives all three
//! over a time window while injecting data-quality defects. Every random draw
//! goes through the caller-owned [`ScenarioRngs`].

pub mod generator;
pub mod layout;
pub mod power_curve;
pub mod wake;
pub mod wind_field;

pub use generator::{
    Anomaly, GeneratedTelemetry, GenerationRequest, InjectionReport, ScenarioRngs,
    TelemetryGenerator,
};
pub use layout::{Turbine, WindFarm};
pub use power_curve::{PowerCurve, PowerOutput};
pub use wake::WakeModel;
pub use wind_field::{WindField, WindSample};

/// Result alias used throughout the simulation crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while configuring or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("noise distribution rejected: {0}")]
    Noise(#[from] rand_distr::NormalError),
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
