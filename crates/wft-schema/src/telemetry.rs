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
use strum::{AsRefStr, Display, EnumString};
use wft_common::time::{date_key, floor_to_millis, hour_key};

use crate::bucket::BucketKey;

/// Operational state reported by a turbine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TurbineStatus {
    Running,
    Stopped,
    CutOut,
}

impl TurbineStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, TurbineStatus::Running)
    }
}

/// Raw telemetry row emitted by the generator and persisted in Bronze.
///
/// Timestamps are carried as epoch milliseconds on disk. Measurement fields
/// may hold injected defects (`NaN`, negative speeds, power spikes); those are
/// data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub event_time: DateTime<Utc>,
    pub farm_id: String,
    pub turbine_id: String,
    pub wind_speed_free_mps: f32,
    pub wind_speed_mps: f32,
    pub wind_dir_deg: f32,
    pub power_kw: f32,
    pub rotor_speed_rpm: f32,
    pub yaw_deg: f32,
    pub status: TurbineStatus,
    pub sim_run_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ingest_time: DateTime<Utc>,
    pub source: String,
}

impl TelemetryRecord {
    /// Natural deduplication key: one report per turbine per instant.
    pub fn dedup_key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.event_time, &self.farm_id, &self.turbine_id)
    }

    /// Logical processing bucket the record belongs to.
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::for_event(&self.sim_run_id, &self.farm_id, self.event_time)
    }

    pub fn hour_key(&self) -> String {
        hour_key(self.event_time)
    }

    pub fn partition_date(&self) -> String {
        date_key(self.event_time)
    }

    /// Floor both timestamps to millisecond resolution.
    pub fn normalized(mut self) -> Self {
        self.event_time = floor_to_millis(self.event_time);
        self.ingest_time = floor_to_millis(self.ingest_time);
        self
    }
}
