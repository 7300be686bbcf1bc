//! ---
//! wft_section: "05-operations"
//! wft_subsection: "library"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Scenario runner shared by the control CLI and end-to-end tests."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
//! Config-driven orchestration of the simulate, curate, aggregate and verify
//! steps. Every stage receives its roots from [`wft_common::LakeConfig`].

pub mod runner;
pub mod scenario;

pub use runner::{RollupSelection, RunReport, TierSelection, TwinRunner};
pub use scenario::{generate_scenario, select_scenarios, SimulationSummary};
