//! ---
//! wft_section: "01-core-functionality"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared primitives and utilities for the twin workspace."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
//! Core shared primitives for the wind farm twin workspace.
//! This crate exposes configuration loading, tracing setup and the hour
//! bucketing helpers consumed by the simulator and every pipeline stage.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AggregationConfig, FarmLayoutConfig, FieldRange, GenerationConfig, LakeConfig, LoggingConfig,
    PowerCurveConfig, QualityConfig, ScenarioConfig, TwinConfig, WakeConfig, WindFieldConfig,
};
pub use logging::{init_tracing, LogFormat};
