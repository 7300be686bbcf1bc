//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use wft_common::config::{FieldRange, QualityConfig};
use wft_schema::TelemetryRecord;

/// Fields found outside their plausibility range, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeCheck {
    fields: Vec<&'static str>,
}

impl RangeCheck {
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn is_clean(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Checks wind speed, direction, rotor speed, yaw and power, in that order.
#[derive(Debug, Clone)]
pub struct RangeValidator {
    rules: [(&'static str, FieldRange); 5],
}

impl RangeValidator {
    pub fn new(quality: QualityConfig) -> Self {
        Self {
            rules: [
                ("wind_speed_mps", quality.wind_speed_mps),
                ("wind_dir_deg", quality.wind_dir_deg),
                ("rotor_speed_rpm", quality.rotor_speed_rpm),
                ("yaw_deg", quality.yaw_deg),
                ("power_kw", quality.power_kw),
            ],
        }
    }

    pub fn check(&self, record: &TelemetryRecord) -> RangeCheck {
        let values = [
            record.wind_speed_mps,
            record.wind_dir_deg,
            record.rotor_speed_rpm,
            record.yaw_deg,
            record.power_kw,
        ];
        let fields = self
            .rules
            .iter()
            .zip(values)
            .filter(|((_, range), value)| violates(*value, *range))
            .map(|((name, _), _)| *name)
            .collect();
        RangeCheck { fields }
    }
}

impl Default for RangeValidator {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

fn violates(value: f32, range: FieldRange) -> bool {
    value.is_nan() || value < range.low || value > range.high
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wft_schema::TurbineStatus;

    fn record() -> TelemetryRecord {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        TelemetryRecord {
            event_time: ts,
            farm_id: "F001".into(),
            turbine_id: "T001".into(),
            wind_speed_free_mps: 8.0,
            wind_speed_mps: 7.5,
            wind_dir_deg: 220.0,
            power_kw: 380.0,
            rotor_speed_rpm: 12.0,
            yaw_deg: 220.0,
            status: TurbineStatus::Running,
            sim_run_id: "SIM-A".into(),
            ingest_time: ts,
            source: "simulator".into(),
        }
    }

    #[test]
    fn plausible_record_is_clean() {
        assert!(RangeValidator::default().check(&record()).is_clean());
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut rec = record();
        rec.wind_speed_mps = 0.0;
        rec.wind_dir_deg = 360.0;
        rec.power_kw = 10_000.0;
        assert!(RangeValidator::default().check(&rec).is_clean());
    }

    #[test]
    fn violations_are_listed_in_check_order() {
        let mut rec = record();
        rec.power_kw = 99_999.0;
        rec.wind_speed_mps = -5.0;
        rec.yaw_deg = f32::NAN;
        let check = RangeValidator::default().check(&rec);
        assert_eq!(check.fields(), &["wind_speed_mps", "yaw_deg", "power_kw"]);
    }

    #[test]
    fn missing_wind_is_a_violation() {
        let mut rec = record();
        rec.wind_speed_mps = f32::NAN;
        assert_eq!(RangeValidator::default().check(&rec).fields(), &["wind_speed_mps"]);
    }
}
