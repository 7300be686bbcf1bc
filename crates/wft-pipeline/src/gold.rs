//! ---
//! wft_section: "04-pipeline"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Incremental pipeline stages over the telemetry lake."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use wft_common::config::AggregationConfig;
use wft_common::time::{floor_to_hour, HOUR_KEY_FORMAT};
use wft_logging::{log_stage_event, twin_warn, LogContext, StageOutcome};
use wft_persistence::{PartitionedTable, ProcessedKeyStore};
use wft_schema::{BucketKey, CuratedRecord, FarmKpiRow, HourlyEnergyRow, CURATED_PARTITION_COLUMNS};

use crate::metrics::PipelineMetrics;
use crate::{report_fault, PipelineError, Result, Stage};

/// Processed-key set of the hourly energy rollup.
pub const HOURLY_ENERGY_STATE: &str = "gold_processed_hours";
/// Processed-key set of the farm KPI rollup.
pub const FARM_KPIS_STATE: &str = "gold_farm_kpis_processed_hours";

const HOURLY_ENERGY_DIR: &str = "hourly_energy";
const FARM_KPIS_DIR: &str = "farm_kpis";

/// Summary of one rollup pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollupOutcome {
    pub location: PathBuf,
    /// Curated rows read from the upstream tier.
    pub rows_read: usize,
    pub rows_written: usize,
    pub buckets_processed: usize,
    pub files: Vec<PathBuf>,
}

/// Arithmetic mean that ignores `NaN` inputs; `NaN` when nothing was counted.
#[derive(Debug, Clone, Copy, Default)]
struct NanMean {
    sum: f64,
    count: u64,
}

impl NanMean {
    fn push(&mut self, value: f32) {
        if !value.is_nan() {
            self.sum += f64::from(value);
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct TurbineHour {
    wind: NanMean,
    power: NanMean,
    energy_kwh: f64,
    not_running: u64,
    bad_rows: u64,
    rows: u64,
}

#[derive(Debug, Default)]
struct FarmHour {
    power: NanMean,
    energy_kwh: f64,
    running: u64,
    bad_rows: u64,
    rows: u64,
    free_wind: NanMean,
    effective_wind: NanMean,
}

/// Hourly rollups over the curated tier.
///
/// The two rollups are independent: each keeps its own processed-key set and
/// output dataset under the gold root.
#[derive(Debug, Clone)]
pub struct AggregationStage {
    curated: PartitionedTable,
    hourly_energy: PartitionedTable,
    farm_kpis: PartitionedTable,
    state: ProcessedKeyStore,
    step: Duration,
    rated_power_kw: f64,
    metrics: Option<PipelineMetrics>,
}

impl AggregationStage {
    pub fn new(
        silver_root: impl Into<PathBuf>,
        gold_root: impl AsRef<Path>,
        state_root: impl Into<PathBuf>,
    ) -> Self {
        let gold_root = gold_root.as_ref();
        Self {
            curated: PartitionedTable::new(silver_root, &CURATED_PARTITION_COLUMNS),
            hourly_energy: PartitionedTable::new(gold_root.join(HOURLY_ENERGY_DIR), &CURATED_PARTITION_COLUMNS),
            farm_kpis: PartitionedTable::new(gold_root.join(FARM_KPIS_DIR), &CURATED_PARTITION_COLUMNS),
            state: ProcessedKeyStore::new(state_root),
            step: Duration::from_secs(60),
            rated_power_kw: 2000.0,
            metrics: None,
        }
    }

    /// Sampling interval of the curated rows.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Per-turbine rated power used for the capacity factor.
    pub fn with_rated_power_kw(mut self, rated_power_kw: f64) -> Self {
        self.rated_power_kw = rated_power_kw;
        self
    }

    /// Apply step and rated power from config; `rated_power_kw` is the
    /// already-resolved farm value.
    pub fn with_config(self, config: &AggregationConfig, rated_power_kw: f64) -> Self {
        self.with_step(config.step).with_rated_power_kw(rated_power_kw)
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn hourly_energy_location(&self) -> &Path {
        self.hourly_energy.root()
    }

    pub fn farm_kpis_location(&self) -> &Path {
        self.farm_kpis.root()
    }

    /// Energy, mean wind/power and downtime per turbine and hour.
    pub fn run_hourly_energy(&self) -> Result<RollupOutcome> {
        report_fault(Stage::GoldEnergy, self.hourly_energy_rollup())
    }

    /// Farm-wide availability, wake loss, data quality and capacity factor per hour.
    pub fn run_farm_kpis(&self) -> Result<RollupOutcome> {
        report_fault(Stage::GoldKpis, self.farm_kpis_rollup())
    }

    fn hourly_energy_rollup(&self) -> Result<RollupOutcome> {
        let started = Instant::now();
        let ctx = LogContext::new().with_stage(Stage::GoldEnergy.as_str());
        let Some(rows) = self.load_curated(&ctx, Stage::GoldEnergy, &self.hourly_energy)? else {
            return Ok(self.empty_outcome(&self.hourly_energy));
        };

        let dt_hours = self.step.as_secs_f64() / 3600.0;
        let downtime_per_row = self.step.as_secs_f64() / 60.0;
        let mut groups: BTreeMap<(String, String, String, DateTime<Utc>), TurbineHour> = BTreeMap::new();
        for row in &rows {
            let key = (
                row.sim_run_id.clone(),
                row.farm_id.clone(),
                row.turbine_id.clone(),
                floor_to_hour(row.event_time),
            );
            let acc = groups.entry(key).or_default();
            acc.wind.push(row.wind_speed_mps);
            acc.power.push(row.power_kw);
            if !row.power_kw.is_nan() {
                acc.energy_kwh += f64::from(row.power_kw) * dt_hours;
            }
            if !row.status.is_running() {
                acc.not_running += 1;
            }
            if row.has_range_violation {
                acc.bad_rows += 1;
            }
            acc.rows += 1;
        }

        let output: Vec<HourlyEnergyRow> = groups
            .into_iter()
            .map(|((sim_run_id, farm_id, turbine_id, hour), acc)| HourlyEnergyRow {
                sim_run_id,
                farm_id,
                turbine_id,
                hour,
                hour_key: hour.format(HOUR_KEY_FORMAT).to_string(),
                wind_speed_mps_avg: acc.wind.value(),
                power_kw_avg: acc.power.value(),
                energy_kwh: acc.energy_kwh,
                downtime_minutes: acc.not_running as f64 * downtime_per_row,
                bad_rows: acc.bad_rows,
                rows: acc.rows,
            })
            .collect();

        self.persist_new(
            Stage::GoldEnergy,
            &ctx,
            HOURLY_ENERGY_STATE,
            &self.hourly_energy,
            output,
            rows.len(),
            started,
            |row| row.bucket_key().to_string(),
            |row| vec![row.sim_run_id.clone(), row.farm_id.clone(), row.partition_date()],
        )
    }

    fn farm_kpis_rollup(&self) -> Result<RollupOutcome> {
        let started = Instant::now();
        let ctx = LogContext::new().with_stage(Stage::GoldKpis.as_str());
        let Some(rows) = self.load_curated(&ctx, Stage::GoldKpis, &self.farm_kpis)? else {
            return Ok(self.empty_outcome(&self.farm_kpis));
        };

        let dt_seconds = self.step.as_secs_f64();
        let dt_hours = dt_seconds / 3600.0;
        let mut groups: BTreeMap<(String, String, DateTime<Utc>), FarmHour> = BTreeMap::new();
        for row in &rows {
            let key = (
                row.sim_run_id.clone(),
                row.farm_id.clone(),
                floor_to_hour(row.event_time),
            );
            let acc = groups.entry(key).or_default();
            acc.power.push(row.power_kw);
            if !row.power_kw.is_nan() {
                acc.energy_kwh += f64::from(row.power_kw) * dt_hours;
            }
            if row.status.is_running() {
                acc.running += 1;
            }
            if row.has_range_violation {
                acc.bad_rows += 1;
            }
            acc.rows += 1;
            acc.free_wind.push(row.wind_speed_free_mps);
            acc.effective_wind.push(row.wind_speed_mps);
        }

        let rows_per_turbine_hour = if dt_seconds > 0.0 {
            (3600.0 / dt_seconds).floor() as u64
        } else {
            0
        };
        let output: Vec<FarmKpiRow> = groups
            .into_iter()
            .map(|((sim_run_id, farm_id, hour), acc)| {
                let n_turbines_est = if rows_per_turbine_hour == 0 {
                    0
                } else {
                    (acc.rows as f64 / rows_per_turbine_hour as f64).round() as u64
                };
                let hour_key = hour.format(HOUR_KEY_FORMAT).to_string();
                let capacity_factor = if n_turbines_est == 0 {
                    let bucket = BucketKey::new(&sim_run_id, &farm_id, &hour_key).to_string();
                    let warn_ctx = ctx
                        .clone()
                        .with_run(&sim_run_id)
                        .with_farm(&farm_id)
                        .with_bucket(&bucket);
                    twin_warn!(
                        context = warn_ctx,
                        "capacity factor undefined for {}: estimated turbine count is zero",
                        hour_key
                    );
                    None
                } else {
                    Some(acc.energy_kwh / (n_turbines_est as f64 * self.rated_power_kw * 1.0))
                };
                let total = acc.rows as f64;
                FarmKpiRow {
                    farm_power_kw_avg: acc.power.value(),
                    farm_energy_kwh: acc.energy_kwh,
                    running_rows: acc.running,
                    total_rows: acc.rows,
                    bad_rows: acc.bad_rows,
                    avg_free_wind: acc.free_wind.value(),
                    avg_effective_wind: acc.effective_wind.value(),
                    availability: acc.running as f64 / total,
                    avg_wake_loss_mps: acc.free_wind.value() - acc.effective_wind.value(),
                    bad_row_rate: acc.bad_rows as f64 / total,
                    n_turbines_est,
                    capacity_factor,
                    sim_run_id,
                    farm_id,
                    hour,
                    hour_key,
                }
            })
            .collect();

        self.persist_new(
            Stage::GoldKpis,
            &ctx,
            FARM_KPIS_STATE,
            &self.farm_kpis,
            output,
            rows.len(),
            started,
            |row| row.bucket_key().to_string(),
            |row| vec![row.sim_run_id.clone(), row.farm_id.clone(), row.partition_date()],
        )
    }

    /// `None` when the curated tier exists but holds no rows.
    fn load_curated(
        &self,
        ctx: &LogContext,
        stage: Stage,
        target: &PartitionedTable,
    ) -> Result<Option<Vec<CuratedRecord>>> {
        if !self.curated.exists() {
            return Err(PipelineError::MissingUpstream {
                path: self.curated.root().to_path_buf(),
            });
        }
        let rows: Vec<CuratedRecord> = self
            .curated
            .read_all::<CuratedRecord>()?
            .into_iter()
            .map(|row| row.row)
            .collect();
        if rows.is_empty() {
            log_stage_event(
                Some(ctx),
                &format!("{stage}.skipped"),
                &format!("no curated rows to aggregate into {}", target.root().display()),
                StageOutcome::NoNewWork,
            );
            return Ok(None);
        }
        Ok(Some(rows))
    }

    fn empty_outcome(&self, target: &PartitionedTable) -> RollupOutcome {
        RollupOutcome {
            location: target.root().to_path_buf(),
            ..RollupOutcome::default()
        }
    }

    /// Drop rows whose bucket is already recorded, write the rest, then record
    /// their buckets.
    #[allow(clippy::too_many_arguments)]
    fn persist_new<T, K, P>(
        &self,
        stage: Stage,
        ctx: &LogContext,
        state_name: &str,
        target: &PartitionedTable,
        output: Vec<T>,
        rows_read: usize,
        started: Instant,
        bucket_of: K,
        partition_of: P,
    ) -> Result<RollupOutcome>
    where
        T: serde::Serialize,
        K: Fn(&T) -> String,
        P: Fn(&T) -> Vec<String>,
    {
        let mut processed = self.state.open(state_name)?;
        let fresh: Vec<T> = output
            .into_iter()
            .filter(|row| !processed.contains(&bucket_of(row)))
            .collect();
        if fresh.is_empty() {
            log_stage_event(
                Some(ctx),
                &format!("{stage}.skipped"),
                "no new hours to process",
                StageOutcome::NoNewWork,
            );
            return Ok(RollupOutcome {
                rows_read,
                ..self.empty_outcome(target)
            });
        }

        let files = target.write_batch(&fresh, partition_of)?;
        for row in &fresh {
            processed.insert(bucket_of(row));
        }
        let buckets_processed = processed.commit()?;

        let outcome = RollupOutcome {
            location: target.root().to_path_buf(),
            rows_read,
            rows_written: fresh.len(),
            buckets_processed,
            files,
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_rows_read(stage, outcome.rows_read);
            metrics.record_rows_written(stage, outcome.rows_written);
            metrics.record_buckets(stage, outcome.buckets_processed);
            metrics.observe_stage_duration(stage, started.elapsed().as_secs_f64());
        }
        log_stage_event(
            Some(ctx),
            &format!("{stage}.completed"),
            &format!(
                "{} rows written for {} new buckets",
                outcome.rows_written, outcome.buckets_processed
            ),
            StageOutcome::Processed,
        );
        Ok(outcome)
    }
}
