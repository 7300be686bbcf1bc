//! ---
//! wft_section: "02-data-model"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared schema definitions for every data tier."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
//! Row contracts for the twin's data tiers.
//!
//! [`TelemetryRecord`] is the unit flowing from the generator into Bronze,
//! [`CuratedRecord`] is what Silver persists, and the two rollup rows make up
//! Gold. Partition columns are never part of these types; they are derived at
//! write time and listed in the `*_PARTITION_COLUMNS` constants.

pub mod bucket;
pub mod curated;
pub mod rollups;
pub mod telemetry;

pub use bucket::BucketKey;
pub use curated::CuratedRecord;
pub use rollups::{FarmKpiRow, HourlyEnergyRow};
pub use telemetry::{TelemetryRecord, TurbineStatus};

/// Column order of the raw telemetry contract.
pub const RAW_COLUMNS: [&str; 13] = [
    "event_time",
    "farm_id",
    "turbine_id",
    "wind_speed_free_mps",
    "wind_speed_mps",
    "wind_dir_deg",
    "power_kw",
    "rotor_speed_rpm",
    "yaw_deg",
    "status",
    "sim_run_id",
    "ingest_time",
    "source",
];

/// Partition layout of the Bronze tier.
pub const RAW_PARTITION_COLUMNS: [&str; 4] = ["sim_run_id", "farm_id", "date", "hour"];

/// Partition layout of the Silver and Gold tiers.
pub const CURATED_PARTITION_COLUMNS: [&str; 3] = ["sim_run_id", "farm_id", "date"];
