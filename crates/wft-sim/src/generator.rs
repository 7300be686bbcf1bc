//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Simulation runtime helpers and scenario engines."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::seq::index;
use tracing::debug;
use wft_common::config::{GenerationConfig, ScenarioConfig};
use wft_schema::TelemetryRecord;

use crate::layout::WindFarm;
use crate::power_curve::PowerCurve;
use crate::wake::WakeModel;
use crate::wind_field::WindField;
use crate::{Result, SimError};

/// Upper bound of the per-row draw that blanks the wind reading.
pub const MISSING_WIND_BAND: f64 = 0.002;
/// Upper bound of the draw that forces an impossible negative wind.
pub const NEGATIVE_WIND_BAND: f64 = 0.004;
/// Upper bound of the draw that forces a power spike.
pub const POWER_SPIKE_BAND: f64 = 0.0055;
/// Share of rows re-emitted as exact duplicates.
pub const DUPLICATE_FRACTION: f64 = 0.002;

pub const INJECTED_NEGATIVE_WIND_MPS: f64 = -5.0;
pub const INJECTED_POWER_SPIKE_KW: f64 = 99_999.0;

/// Single-row defect selected from one uniform draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    MissingWindSpeed,
    NegativeWindSpeed,
    PowerSpike,
}

impl Anomaly {
    /// Bands are disjoint, so at most one defect applies per row.
    pub fn classify(draw: f64) -> Option<Self> {
        if draw < MISSING_WIND_BAND {
            Some(Anomaly::MissingWindSpeed)
        } else if draw < NEGATIVE_WIND_BAND {
            Some(Anomaly::NegativeWindSpeed)
        } else if draw < POWER_SPIKE_BAND {
            Some(Anomaly::PowerSpike)
        } else {
            None
        }
    }
}

/// The two independent random streams of a scenario.
///
/// `wind` feeds the wind field noise; `telemetry` feeds defect injection and
/// duplicate selection. Reusing the same seeds reproduces a run exactly.
#[derive(Debug, Clone)]
pub struct ScenarioRngs {
    pub wind: StdRng,
    pub telemetry: StdRng,
}

impl ScenarioRngs {
    pub fn from_seeds(wind_seed: u64, telemetry_seed: u64) -> Self {
        Self {
            wind: StdRng::seed_from_u64(wind_seed),
            telemetry: StdRng::seed_from_u64(telemetry_seed),
        }
    }

    pub fn for_scenario(scenario: &ScenarioConfig) -> Self {
        Self::from_seeds(scenario.wind_seed, scenario.telemetry_seed)
    }
}

/// Time window for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub start: DateTime<Utc>,
    pub duration_hours: f64,
    pub step: Duration,
    pub inject_issues: bool,
    /// Stamped on every emitted row.
    pub ingest_time: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(start: DateTime<Utc>, duration_hours: f64, step: Duration) -> Self {
        Self {
            start,
            duration_hours,
            step,
            inject_issues: true,
            ingest_time: Utc::now(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.start, config.duration_hours, config.step).with_issues(config.inject_issues)
    }

    pub fn with_issues(mut self, inject_issues: bool) -> Self {
        self.inject_issues = inject_issues;
        self
    }

    pub fn with_ingest_time(mut self, ingest_time: DateTime<Utc>) -> Self {
        self.ingest_time = ingest_time;
        self
    }

    /// `floor(duration_hours * 3600 / step_seconds)`.
    pub fn step_count(&self) -> Result<usize> {
        if self.step.is_zero() {
            return Err(SimError::invalid("step", "must be greater than zero"));
        }
        if !self.duration_hours.is_finite() || self.duration_hours < 0.0 {
            return Err(SimError::invalid(
                "duration_hours",
                format!("must be a non-negative number, got {}", self.duration_hours),
            ));
        }
        Ok((self.duration_hours * 3600.0 / self.step.as_secs_f64()).floor() as usize)
    }
}

/// Counts of defects injected into one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub missing_wind: usize,
    pub negative_wind: usize,
    pub power_spikes: usize,
    pub duplicates: usize,
}

impl InjectionReport {
    fn record(&mut self, anomaly: Anomaly) {
        match anomaly {
            Anomaly::MissingWindSpeed => self.missing_wind += 1,
            Anomaly::NegativeWindSpeed => self.negative_wind += 1,
            Anomaly::PowerSpike => self.power_spikes += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedTelemetry {
    pub records: Vec<TelemetryRecord>,
    pub injected: InjectionReport,
}

impl GeneratedTelemetry {
    pub fn into_records(self) -> Vec<TelemetryRecord> {
        self.records
    }
}

/// Produces time-ordered farm telemetry for one simulation run.
#[derive(Debug, Clone)]
pub struct TelemetryGenerator {
    farm: WindFarm,
    wind_field: WindField,
    power_curve: PowerCurve,
    wake: Option<WakeModel>,
    sim_run_id: String,
    source: String,
}

impl TelemetryGenerator {
    pub fn new(
        farm: WindFarm,
        wind_field: WindField,
        power_curve: PowerCurve,
        sim_run_id: impl Into<String>,
    ) -> Self {
        Self {
            farm,
            wind_field,
            power_curve,
            wake: None,
            sim_run_id: sim_run_id.into(),
            source: "simulator".to_owned(),
        }
    }

    /// Assemble a generator from a scenario definition.
    pub fn for_scenario(
        farm: WindFarm,
        power_curve: PowerCurve,
        scenario: &ScenarioConfig,
        source: &str,
    ) -> Result<Self> {
        let generator = Self::new(
            farm,
            WindField::new(scenario.wind)?,
            power_curve,
            scenario.sim_run_id.clone(),
        )
        .with_source(source);
        Ok(if scenario.wake_enabled {
            generator.with_wake(WakeModel::new(scenario.wake))
        } else {
            generator
        })
    }

    pub fn with_wake(mut self, wake: WakeModel) -> Self {
        self.wake = Some(wake);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Emit `n_steps * n_turbines` rows in (step, turbine) order, followed by
    /// injected duplicates when `inject_issues` is set.
    pub fn generate(&self, rngs: &mut ScenarioRngs, request: &GenerationRequest) -> Result<GeneratedTelemetry> {
        let n_steps = request.step_count()?;
        let step_ms = i64::try_from(request.step.as_millis())
            .map_err(|_| SimError::invalid("step", "does not fit in milliseconds"))?;
        let dt_seconds = request.step.as_secs_f64();
        let turbines = self.farm.turbines();

        let mut records = Vec::with_capacity(n_steps * turbines.len());
        let mut injected = InjectionReport::default();

        for step in 0..n_steps {
            let event_time = request.start + chrono::Duration::milliseconds(step_ms * step as i64);
            let t_seconds = step as f64 * dt_seconds;

            for turbine in turbines {
                let wind = self
                    .wind_field
                    .sample(&mut rngs.wind, t_seconds, turbine.x_m, turbine.y_m);
                let effective = match &self.wake {
                    Some(wake) => wake.effective_speed(wind.speed_mps, wind.direction_deg, turbine, turbines),
                    None => wind.speed_mps,
                };
                let direction = direction_f32(wind.direction_deg);
                let output = self.power_curve.output(effective, turbine.rated_power_kw);
                let rotor_rpm = if output.status.is_running() {
                    6.0 + (effective.min(12.0) - 3.0) * (12.0 / 9.0)
                } else {
                    0.0
                };

                let mut reported_wind = effective;
                let mut reported_power = output.power_kw;
                if request.inject_issues {
                    if let Some(anomaly) = Anomaly::classify(rngs.telemetry.gen::<f64>()) {
                        injected.record(anomaly);
                        match anomaly {
                            Anomaly::MissingWindSpeed => reported_wind = f64::NAN,
                            Anomaly::NegativeWindSpeed => reported_wind = INJECTED_NEGATIVE_WIND_MPS,
                            Anomaly::PowerSpike => reported_power = INJECTED_POWER_SPIKE_KW,
                        }
                    }
                }

                records.push(TelemetryRecord {
                    event_time,
                    farm_id: self.farm.farm_id().to_owned(),
                    turbine_id: turbine.turbine_id.clone(),
                    wind_speed_free_mps: wind.speed_mps as f32,
                    wind_speed_mps: reported_wind as f32,
                    wind_dir_deg: direction,
                    power_kw: reported_power as f32,
                    rotor_speed_rpm: rotor_rpm as f32,
                    yaw_deg: direction,
                    status: output.status,
                    sim_run_id: self.sim_run_id.clone(),
                    ingest_time: request.ingest_time,
                    source: self.source.clone(),
                });
            }
        }

        if request.inject_issues && !records.is_empty() {
            let count = ((DUPLICATE_FRACTION * records.len() as f64) as usize).max(1);
            let picks = index::sample(&mut rngs.telemetry, records.len(), count);
            let copies: Vec<TelemetryRecord> = picks.iter().map(|i| records[i].clone()).collect();
            injected.duplicates = copies.len();
            records.extend(copies);
        }

        debug!(
            sim_run_id = %self.sim_run_id,
            rows = records.len(),
            missing_wind = injected.missing_wind,
            negative_wind = injected.negative_wind,
            power_spikes = injected.power_spikes,
            duplicates = injected.duplicates,
            "generated telemetry batch"
        );
        Ok(GeneratedTelemetry { records, injected })
    }
}

/// Narrow a wrapped direction to `f32` without letting it round up to 360.
fn direction_f32(direction_deg: f64) -> f32 {
    let narrowed = direction_deg as f32;
    if narrowed >= 360.0 {
        0.0
    } else {
        narrowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use wft_common::config::{FarmLayoutConfig, PowerCurveConfig};
    use wft_schema::TurbineStatus;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()
    }

    fn generator(scenario: &ScenarioConfig) -> TelemetryGenerator {
        TelemetryGenerator::for_scenario(
            WindFarm::grid(&FarmLayoutConfig::default()),
            PowerCurve::new(PowerCurveConfig::default()).unwrap(),
            scenario,
            "simulator",
        )
        .unwrap()
    }

    fn six_hours() -> GenerationRequest {
        GenerationRequest::new(start(), 6.0, Duration::from_secs(60)).with_ingest_time(start())
    }

    fn same_bits(a: &TelemetryRecord, b: &TelemetryRecord) -> bool {
        a.event_time == b.event_time
            && a.turbine_id == b.turbine_id
            && a.wind_speed_free_mps.to_bits() == b.wind_speed_free_mps.to_bits()
            && a.wind_speed_mps.to_bits() == b.wind_speed_mps.to_bits()
            && a.power_kw.to_bits() == b.power_kw.to_bits()
            && a.status == b.status
    }

    #[test]
    fn anomaly_bands_are_disjoint() {
        assert_eq!(Anomaly::classify(0.0), Some(Anomaly::MissingWindSpeed));
        assert_eq!(Anomaly::classify(0.0019), Some(Anomaly::MissingWindSpeed));
        assert_eq!(Anomaly::classify(0.002), Some(Anomaly::NegativeWindSpeed));
        assert_eq!(Anomaly::classify(0.004), Some(Anomaly::PowerSpike));
        assert_eq!(Anomaly::classify(0.0055), None);
        assert_eq!(Anomaly::classify(0.9), None);
    }

    #[test]
    fn six_hours_of_minutes_yield_expected_row_count() {
        let scenario = ScenarioConfig::new("SIM-A");
        let batch = generator(&scenario)
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &six_hours())
            .unwrap();
        // 360 steps x 12 turbines plus floor(0.002 * 4320) = 8 duplicates.
        assert_eq!(batch.records.len(), 4328);
        assert_eq!(batch.injected.duplicates, 8);

        let mut per_key: HashMap<_, usize> = HashMap::new();
        for rec in &batch.records {
            *per_key.entry((rec.event_time, rec.turbine_id.clone())).or_default() += 1;
        }
        assert_eq!(per_key.len(), 4320);
        assert_eq!(per_key.values().filter(|&&n| n > 1).count(), 8);

        let first = &batch.records[0];
        assert_eq!(first.event_time, start());
        assert_eq!(first.turbine_id, "T001");
        assert_eq!(batch.records[12].event_time, start() + chrono::Duration::minutes(1));
    }

    #[test]
    fn identical_seeds_reproduce_the_batch() {
        let scenario = ScenarioConfig::new("SIM-A");
        let gen = generator(&scenario);
        let a = gen
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &six_hours())
            .unwrap();
        let b = gen
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &six_hours())
            .unwrap();
        assert_eq!(a.records.len(), b.records.len());
        assert!(a.records.iter().zip(&b.records).all(|(x, y)| same_bits(x, y)));
        assert_eq!(a.injected, b.injected);
    }

    #[test]
    fn clean_run_has_no_defects_and_consistent_physics() {
        let scenario = ScenarioConfig::new("SIM-B");
        let request = six_hours().with_issues(false);
        let batch = generator(&scenario)
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &request)
            .unwrap();
        assert_eq!(batch.records.len(), 4320);
        assert_eq!(batch.injected, InjectionReport::default());

        for rec in &batch.records {
            assert!(rec.wind_speed_mps >= 0.0);
            assert!(rec.wind_speed_mps <= rec.wind_speed_free_mps);
            assert!(rec.power_kw <= 2000.0);
            assert_eq!(rec.yaw_deg, rec.wind_dir_deg);
            if rec.status == TurbineStatus::Running {
                assert!(rec.rotor_speed_rpm >= 6.0);
            } else {
                assert_eq!(rec.rotor_speed_rpm, 0.0);
                assert_eq!(rec.power_kw, 0.0);
            }
        }
    }

    #[test]
    fn disabling_wake_leaves_free_stream_untouched() {
        let mut scenario = ScenarioConfig::new("SIM-C");
        scenario.wake_enabled = false;
        let request = six_hours().with_issues(false);
        let batch = generator(&scenario)
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &request)
            .unwrap();
        assert!(batch
            .records
            .iter()
            .all(|r| r.wind_speed_mps.to_bits() == r.wind_speed_free_mps.to_bits()));
    }

    #[test]
    fn zero_step_is_rejected() {
        let scenario = ScenarioConfig::new("SIM-A");
        let request = GenerationRequest::new(start(), 1.0, Duration::ZERO);
        assert!(generator(&scenario)
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &request)
            .is_err());
    }

    #[test]
    fn window_shorter_than_a_step_is_empty() {
        let scenario = ScenarioConfig::new("SIM-A");
        let request = GenerationRequest::new(start(), 0.01, Duration::from_secs(60));
        let batch = generator(&scenario)
            .generate(&mut ScenarioRngs::for_scenario(&scenario), &request)
            .unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.injected.duplicates, 0);
    }

    #[test]
    fn narrowed_direction_stays_below_full_circle() {
        assert_eq!(direction_f32(359.999_999_99), 0.0);
        assert_eq!(direction_f32(0.0), 0.0);
        assert_eq!(direction_f32(359.5), 359.5);
        assert!((direction_f32(123.25) - 123.25).abs() < 1e-6);
    }
}
