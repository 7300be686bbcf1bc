//! ---
//! wft_section: "01-core-functionality"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared primitives and utilities for the twin workspace."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_lake_root() -> PathBuf {
    PathBuf::from("data_lake")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_generation_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn default_duration_hours() -> f64 {
    6.0
}

fn default_step() -> Duration {
    Duration::from_secs(60)
}

fn default_inject_issues() -> bool {
    true
}

fn default_source() -> String {
    "simulator".to_owned()
}

fn default_wind_seed() -> u64 {
    42
}

fn default_telemetry_seed() -> u64 {
    123
}

fn default_wake_enabled() -> bool {
    true
}

/// Primary configuration object for a twin deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinConfig {
    #[serde(default)]
    pub lake: LakeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub farm: FarmLayoutConfig,
    #[serde(default)]
    pub power_curve: PowerCurveConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// Metadata describing where a [`TwinConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedTwinConfig {
    pub config: TwinConfig,
    pub source: PathBuf,
}

impl TwinConfig {
    pub const ENV_CONFIG_PATH: &str = "WFT_CONFIG";

    /// Load configuration from disk, respecting the `WFT_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedTwinConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedTwinConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedTwinConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<TwinConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Retrieve a scenario by run identifier.
    pub fn scenario(&self, sim_run_id: &str) -> Option<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.sim_run_id == sim_run_id)
    }

    /// Run identifiers of every configured scenario, in declaration order.
    pub fn run_ids(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.sim_run_id.clone()).collect()
    }

    /// Rated power used by the capacity factor rollup.
    pub fn aggregation_rated_power_kw(&self) -> f64 {
        self.aggregation
            .rated_power_kw
            .unwrap_or(self.farm.rated_power_kw)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(anyhow!("configuration must contain at least one scenario"));
        }
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.sim_run_id.as_str()) {
                return Err(anyhow!(
                    "scenario '{}' is declared more than once",
                    scenario.sim_run_id
                ));
            }
        }
        self.farm.validate()?;
        self.power_curve.validate()?;
        self.generation.validate()?;
        self.quality.validate()?;
        self.aggregation.validate()?;
        Ok(())
    }
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            lake: LakeConfig::default(),
            logging: LoggingConfig::default(),
            farm: FarmLayoutConfig::default(),
            power_curve: PowerCurveConfig::default(),
            generation: GenerationConfig::default(),
            scenarios: vec![ScenarioConfig::new("SIM-001")],
            quality: QualityConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl std::str::FromStr for TwinConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: TwinConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Locations of the three data tiers and the processed-key state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakeConfig {
    #[serde(default = "default_lake_root")]
    pub root: PathBuf,
}

impl LakeConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn bronze_root(&self) -> PathBuf {
        self.root.join("bronze")
    }

    pub fn silver_root(&self) -> PathBuf {
        self.root.join("silver")
    }

    pub fn gold_root(&self) -> PathBuf {
        self.root.join("gold")
    }

    pub fn state_root(&self) -> PathBuf {
        self.root.join("_state")
    }
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self {
            root: default_lake_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
        }
    }
}

/// Rectangular grid layout used to build the simulated farm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmLayoutConfig {
    pub farm_id: String,
    pub rows: usize,
    pub cols: usize,
    pub spacing_m: f64,
    pub rated_power_kw: f64,
}

impl FarmLayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.farm_id.trim().is_empty() {
            return Err(anyhow!("farm.farm_id must not be empty"));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(anyhow!("farm layout must have at least one row and column"));
        }
        if !(self.spacing_m > 0.0) {
            return Err(anyhow!("farm.spacing_m must be positive"));
        }
        if !(self.rated_power_kw > 0.0) {
            return Err(anyhow!("farm.rated_power_kw must be positive"));
        }
        Ok(())
    }
}

impl Default for FarmLayoutConfig {
    fn default() -> Self {
        Self {
            farm_id: "F001".to_owned(),
            rows: 3,
            cols: 4,
            spacing_m: 600.0,
            rated_power_kw: 2000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PowerCurveConfig {
    pub cut_in_mps: f64,
    pub rated_mps: f64,
    pub cut_out_mps: f64,
}

impl PowerCurveConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cut_in_mps >= 0.0
            && self.cut_in_mps < self.rated_mps
            && self.rated_mps < self.cut_out_mps)
        {
            return Err(anyhow!(
                "power curve thresholds must satisfy 0 <= cut_in < rated < cut_out (got {} / {} / {})",
                self.cut_in_mps,
                self.rated_mps,
                self.cut_out_mps
            ));
        }
        Ok(())
    }
}

impl Default for PowerCurveConfig {
    fn default() -> Self {
        Self {
            cut_in_mps: 3.0,
            rated_mps: 12.0,
            cut_out_mps: 25.0,
        }
    }
}

/// Time window and defect injection settings shared by every scenario.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_start")]
    pub start: DateTime<Utc>,
    #[serde(default = "default_duration_hours")]
    pub duration_hours: f64,
    /// Interval between samples, in whole seconds.
    #[serde(default = "default_step")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub step: Duration,
    #[serde(default = "default_inject_issues")]
    pub inject_issues: bool,
    #[serde(default = "default_source")]
    pub source: String,
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step.is_zero() {
            return Err(anyhow!("generation.step must be greater than zero"));
        }
        if !(self.duration_hours > 0.0) {
            return Err(anyhow!("generation.duration_hours must be positive"));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            start: default_generation_start(),
            duration_hours: default_duration_hours(),
            step: default_step(),
            inject_issues: default_inject_issues(),
            source: default_source(),
        }
    }
}

/// One simulation run: seeds plus wind and wake parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub sim_run_id: String,
    #[serde(default = "default_wind_seed")]
    pub wind_seed: u64,
    #[serde(default = "default_telemetry_seed")]
    pub telemetry_seed: u64,
    #[serde(default)]
    pub wind: WindFieldConfig,
    #[serde(default = "default_wake_enabled")]
    pub wake_enabled: bool,
    #[serde(default)]
    pub wake: WakeConfig,
}

impl ScenarioConfig {
    pub fn new(sim_run_id: impl Into<String>) -> Self {
        Self {
            sim_run_id: sim_run_id.into(),
            wind_seed: default_wind_seed(),
            telemetry_seed: default_telemetry_seed(),
            wind: WindFieldConfig::default(),
            wake_enabled: default_wake_enabled(),
            wake: WakeConfig::default(),
        }
    }

    pub fn with_wake_strength(mut self, wake_strength: f64) -> Self {
        self.wake.wake_strength = wake_strength;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sim_run_id.trim().is_empty() {
            return Err(anyhow!("scenario sim_run_id must not be empty"));
        }
        if self.wind.noise_std_mps < 0.0 || self.wind.dir_noise_std_deg < 0.0 {
            return Err(anyhow!(
                "scenario '{}' noise standard deviations must be non-negative",
                self.sim_run_id
            ));
        }
        if self.wake_enabled {
            if !(self.wake.decay_length_m > 0.0 && self.wake.crosswind_sigma_m > 0.0) {
                return Err(anyhow!(
                    "scenario '{}' wake decay length and crosswind sigma must be positive",
                    self.sim_run_id
                ));
            }
            if !(0.0..=1.0).contains(&self.wake.wake_strength) {
                return Err(anyhow!(
                    "scenario '{}' wake_strength must lie within [0, 1]",
                    self.sim_run_id
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindFieldConfig {
    pub base_speed_mps: f64,
    pub daily_variation_mps: f64,
    pub spatial_variation_mps: f64,
    pub noise_std_mps: f64,
    pub base_dir_deg: f64,
    pub dir_noise_std_deg: f64,
}

impl Default for WindFieldConfig {
    fn default() -> Self {
        Self {
            base_speed_mps: 8.0,
            daily_variation_mps: 2.0,
            spatial_variation_mps: 0.8,
            noise_std_mps: 0.6,
            base_dir_deg: 220.0,
            dir_noise_std_deg: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WakeConfig {
    /// Fractional speed loss directly downwind of a source turbine.
    pub wake_strength: f64,
    /// Distance over which a wake recovers.
    pub decay_length_m: f64,
    /// Lateral width of a wake.
    pub crosswind_sigma_m: f64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            wake_strength: 0.18,
            decay_length_m: 900.0,
            crosswind_sigma_m: 250.0,
        }
    }
}

/// Closed plausibility interval for one telemetry field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FieldRange {
    pub low: f32,
    pub high: f32,
}

impl FieldRange {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

/// Plausibility ranges applied by the curation stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub wind_speed_mps: FieldRange,
    pub wind_dir_deg: FieldRange,
    pub rotor_speed_rpm: FieldRange,
    pub yaw_deg: FieldRange,
    pub power_kw: FieldRange,
}

impl QualityConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, range) in [
            ("wind_speed_mps", self.wind_speed_mps),
            ("wind_dir_deg", self.wind_dir_deg),
            ("rotor_speed_rpm", self.rotor_speed_rpm),
            ("yaw_deg", self.yaw_deg),
            ("power_kw", self.power_kw),
        ] {
            if !(range.low <= range.high) {
                return Err(anyhow!(
                    "quality range for {} is inverted ({} > {})",
                    name,
                    range.low,
                    range.high
                ));
            }
        }
        Ok(())
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            wind_speed_mps: FieldRange::new(0.0, 60.0),
            wind_dir_deg: FieldRange::new(0.0, 360.0),
            rotor_speed_rpm: FieldRange::new(0.0, 30.0),
            yaw_deg: FieldRange::new(0.0, 360.0),
            power_kw: FieldRange::new(0.0, 10_000.0),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Sampling interval the curated rows were produced with.
    #[serde(default = "default_step")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub step: Duration,
    /// Falls back to `farm.rated_power_kw` when unset.
    #[serde(default)]
    pub rated_power_kw: Option<f64>,
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step.is_zero() {
            return Err(anyhow!("aggregation.step must be greater than zero"));
        }
        if let Some(rated) = self.rated_power_kw {
            if !(rated > 0.0) {
                return Err(anyhow!("aggregation.rated_power_kw must be positive"));
            }
        }
        Ok(())
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            rated_power_kw: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = TwinConfig::from_str(
            r#"
            [[scenarios]]
            sim_run_id = "SIM-A"

            [[scenarios]]
            sim_run_id = "SIM-B"
            [scenarios.wake]
            wake_strength = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.run_ids(), vec!["SIM-A", "SIM-B"]);
        assert_eq!(config.generation.step, Duration::from_secs(60));
        assert_eq!(config.farm.rows * config.farm.cols, 12);
        let b = config.scenario("SIM-B").unwrap();
        assert_eq!(b.wake.wake_strength, 0.25);
        assert_eq!(b.wake.decay_length_m, 900.0);
        assert_eq!(config.aggregation_rated_power_kw(), 2000.0);
        assert_eq!(config.lake.silver_root(), PathBuf::from("data_lake/silver"));
    }

    #[test]
    fn logging_section_selects_console_format() {
        let config = TwinConfig::from_str(
            r#"
            [logging]
            format = "structured-json"

            [[scenarios]]
            sim_run_id = "SIM-A"
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert_eq!(config.logging.directory, default_logging_directory());
    }

    #[test]
    fn rejects_duplicate_run_ids() {
        let err = TwinConfig::from_str(
            r#"
            [[scenarios]]
            sim_run_id = "SIM-A"
            [[scenarios]]
            sim_run_id = "SIM-A"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_unordered_power_curve() {
        let err = TwinConfig::from_str(
            r#"
            [power_curve]
            cut_in_mps = 12.0
            rated_mps = 3.0

            [[scenarios]]
            sim_run_id = "SIM-A"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("power curve"));
    }

    #[test]
    fn loads_from_candidate_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twin.toml");
        fs::write(
            &path,
            "[generation]\nstep = 30\n\n[[scenarios]]\nsim_run_id = \"SIM-X\"\n",
        )
        .unwrap();
        let loaded = TwinConfig::load_with_source(&[dir.path().join("missing.toml"), path.clone()])
            .unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.generation.step, Duration::from_secs(30));
    }
}
