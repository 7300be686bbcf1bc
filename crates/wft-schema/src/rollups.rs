//! ---
//! wft_section: "02-data-model"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared schema definitions for every data tier."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wft_common::time::date_key;

use crate::bucket::BucketKey;

/// Gold row: energy and downtime of one turbine over one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyEnergyRow {
    pub sim_run_id: String,
    pub farm_id: String,
    pub turbine_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub hour: DateTime<Utc>,
    pub hour_key: String,
    /// `NaN` when every wind reading in the hour was missing.
    pub wind_speed_mps_avg: f64,
    pub power_kw_avg: f64,
    pub energy_kwh: f64,
    pub downtime_minutes: f64,
    pub bad_rows: u64,
    pub rows: u64,
}

impl HourlyEnergyRow {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::new(&self.sim_run_id, &self.farm_id, &self.hour_key)
    }

    pub fn partition_date(&self) -> String {
        date_key(self.hour)
    }
}

/// Gold row: farm-wide KPIs over one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmKpiRow {
    pub sim_run_id: String,
    pub farm_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub hour: DateTime<Utc>,
    pub hour_key: String,
    pub farm_power_kw_avg: f64,
    pub farm_energy_kwh: f64,
    pub running_rows: u64,
    pub total_rows: u64,
    pub bad_rows: u64,
    pub avg_free_wind: f64,
    pub avg_effective_wind: f64,
    pub availability: f64,
    pub avg_wake_loss_mps: f64,
    pub bad_row_rate: f64,
    /// Row-density estimate, `round(total_rows / rows_per_turbine_per_hour)`.
    pub n_turbines_est: u64,
    /// Undefined when `n_turbines_est` is zero.
    pub capacity_factor: Option<f64>,
}

impl FarmKpiRow {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::new(&self.sim_run_id, &self.farm_id, &self.hour_key)
    }

    pub fn partition_date(&self) -> String {
        date_key(self.hour)
    }
}
