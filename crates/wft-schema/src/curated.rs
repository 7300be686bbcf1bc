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
use crate::telemetry::{TelemetryRecord, TurbineStatus};

/// Silver row: the raw contract plus data-quality flags.
///
/// Kept flat (rather than wrapping [`TelemetryRecord`]) so the CSV header is a
/// single row of scalar columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedRecord {
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
    pub is_duplicate: bool,
    pub has_range_violation: bool,
    pub range_violation_fields: String,
}

impl CuratedRecord {
    /// Attach quality flags to a raw record. `violations` are joined with `,`
    /// in the order given.
    pub fn from_telemetry(record: TelemetryRecord, is_duplicate: bool, violations: &[&str]) -> Self {
        Self {
            event_time: record.event_time,
            farm_id: record.farm_id,
            turbine_id: record.turbine_id,
            wind_speed_free_mps: record.wind_speed_free_mps,
            wind_speed_mps: record.wind_speed_mps,
            wind_dir_deg: record.wind_dir_deg,
            power_kw: record.power_kw,
            rotor_speed_rpm: record.rotor_speed_rpm,
            yaw_deg: record.yaw_deg,
            status: record.status,
            sim_run_id: record.sim_run_id,
            ingest_time: record.ingest_time,
            source: record.source,
            is_duplicate,
            has_range_violation: !violations.is_empty(),
            range_violation_fields: violations.join(","),
        }
    }

    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::for_event(&self.sim_run_id, &self.farm_id, self.event_time)
    }

    pub fn partition_date(&self) -> String {
        date_key(self.event_time)
    }

    /// Field names listed in `range_violation_fields`.
    pub fn violation_fields(&self) -> impl Iterator<Item = &str> {
        self.range_violation_fields
            .split(',')
            .filter(|field| !field.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn flags_follow_violation_list() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let raw = TelemetryRecord {
            event_time: ts,
            farm_id: "F001".into(),
            turbine_id: "T004".into(),
            wind_speed_free_mps: 7.5,
            wind_speed_mps: -5.0,
            wind_dir_deg: 221.0,
            power_kw: 99999.0,
            rotor_speed_rpm: 11.0,
            yaw_deg: 221.0,
            status: TurbineStatus::Running,
            sim_run_id: "SIM-A".into(),
            ingest_time: ts,
            source: "simulator".into(),
        };

        let clean = CuratedRecord::from_telemetry(raw.clone(), false, &[]);
        assert!(!clean.has_range_violation);
        assert_eq!(clean.range_violation_fields, "");
        assert_eq!(clean.violation_fields().count(), 0);

        let flagged = CuratedRecord::from_telemetry(raw, false, &["wind_speed_mps", "power_kw"]);
        assert!(flagged.has_range_violation);
        assert_eq!(flagged.range_violation_fields, "wind_speed_mps,power_kw");
        assert_eq!(
            flagged.violation_fields().collect::<Vec<_>>(),
            vec!["wind_speed_mps", "power_kw"]
        );
    }
}
