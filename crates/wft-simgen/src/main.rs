//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "01-bootstrap"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Telemetry generator utility for ad-hoc scenario output."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use wft_common::config::{FarmLayoutConfig, PowerCurveConfig, ScenarioConfig, WakeConfig};
use wft_schema::TelemetryRecord;
use wft_sim::{GenerationRequest, PowerCurve, ScenarioRngs, TelemetryGenerator, WindFarm};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate wind farm telemetry without touching the data lake",
    long_about = None
)]
struct Cli {
    /// Simulation run identifier stamped on every row
    #[arg(long, default_value = "SIM-001")]
    run_id: String,

    /// Farm identifier stamped on every row
    #[arg(long, default_value = "F001")]
    farm_id: String,

    /// Turbine grid rows
    #[arg(long, default_value_t = 3)]
    rows: usize,

    /// Turbine grid columns
    #[arg(long, default_value_t = 4)]
    cols: usize,

    /// Distance between neighbouring turbines in metres
    #[arg(long, default_value_t = 600.0)]
    spacing_m: f64,

    /// Rated power per turbine in kW
    #[arg(long, default_value_t = 2000.0)]
    rated_power_kw: f64,

    /// First sample timestamp (RFC 3339)
    #[arg(long, default_value = "2026-01-05T00:00:00Z")]
    start: DateTime<Utc>,

    /// Hours of telemetry to synthesise
    #[arg(long, default_value_t = 6.0)]
    hours: f64,

    /// Seconds between samples
    #[arg(long, default_value_t = 60)]
    step_secs: u64,

    /// Seed for wind field noise
    #[arg(long, default_value_t = 42)]
    wind_seed: u64,

    /// Seed for anomaly injection and duplicate selection
    #[arg(long, default_value_t = 123)]
    telemetry_seed: u64,

    /// Fractional speed loss directly behind a turbine
    #[arg(long, default_value_t = 0.18)]
    wake_strength: f64,

    /// Disable wake interaction entirely
    #[arg(long)]
    no_wake: bool,

    /// Skip anomaly and duplicate injection
    #[arg(long)]
    clean: bool,

    /// Output file path. Use '-' for stdout.
    #[arg(long, default_value = "telemetry.csv")]
    output: PathBuf,

    /// Explicit output format when extension is ambiguous
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.step_secs == 0 {
        return Err(anyhow!("step-secs must be greater than zero"));
    }

    let format = determine_format(&cli.output, cli.format);
    let records = generate(&cli)?;
    match format {
        OutputFormat::Csv => write_csv(&cli.output, &records)?,
        OutputFormat::Json => write_json(&cli.output, &records)?,
    }

    if cli.output.as_os_str() != "-" {
        eprintln!(
            "generated {} rows for {}/{} -> {}",
            records.len(),
            cli.run_id,
            cli.farm_id,
            cli.output.display()
        );
    }
    Ok(())
}

fn scenario(cli: &Cli) -> ScenarioConfig {
    ScenarioConfig {
        wind_seed: cli.wind_seed,
        telemetry_seed: cli.telemetry_seed,
        wake_enabled: !cli.no_wake,
        wake: WakeConfig {
            wake_strength: cli.wake_strength,
            ..WakeConfig::default()
        },
        ..ScenarioConfig::new(cli.run_id.clone())
    }
}

fn generate(cli: &Cli) -> Result<Vec<TelemetryRecord>> {
    let layout = FarmLayoutConfig {
        farm_id: cli.farm_id.clone(),
        rows: cli.rows,
        cols: cli.cols,
        spacing_m: cli.spacing_m,
        rated_power_kw: cli.rated_power_kw,
    };
    layout.validate()?;
    let scenario = scenario(cli);
    scenario.validate()?;

    let generator = TelemetryGenerator::for_scenario(
        WindFarm::grid(&layout),
        PowerCurve::new(PowerCurveConfig::default())?,
        &scenario,
        "simulator",
    )?;
    let request = GenerationRequest::new(cli.start, cli.hours, Duration::from_secs(cli.step_secs))
        .with_issues(!cli.clean);
    let batch = generator
        .generate(&mut ScenarioRngs::for_scenario(&scenario), &request)
        .context("telemetry generation failed")?;
    Ok(batch.into_records())
}

fn determine_format(path: &Path, override_format: Option<OutputFormat>) -> OutputFormat {
    if let Some(format) = override_format {
        return format;
    }
    if path.as_os_str() == "-" {
        return OutputFormat::Json;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Csv,
    }
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn write_csv(path: &Path, records: &[TelemetryRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(open_output(path)?);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Missing readings are written as JSON `null`.
fn write_json(path: &Path, records: &[TelemetryRecord]) -> Result<()> {
    let mut writer = open_output(path)?;
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
