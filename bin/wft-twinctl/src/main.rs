//! ---
//! wft_section: "05-operations"
//! wft_subsection: "binary"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Control CLI that simulates scenarios and drives the pipeline stages."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use wft_common::{init_tracing, TwinConfig};
use wft_twinctl::{RollupSelection, TierSelection, TwinRunner};

const CONFIG_CANDIDATES: [&str; 2] = ["configs/wind_farm_twin.toml", "wind_farm_twin.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Wind farm twin control utility",
    long_about = None
)]
struct Cli {
    /// Configuration file. Falls back to WFT_CONFIG, then the default locations.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate configured scenarios and append them to Bronze
    Simulate(SimulateArgs),
    /// Curate new Bronze hours into Silver
    Curate,
    /// Roll new Silver hours up into Gold
    Aggregate(AggregateArgs),
    /// Check that a tier holds the expected runs
    Verify(VerifyArgs),
    /// Simulate, curate, aggregate and verify in one pass
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Only simulate this scenario
    #[arg(long, value_name = "ID")]
    scenario: Option<String>,
}

#[derive(Debug, Args)]
struct AggregateArgs {
    #[arg(long, value_enum, default_value_t = RollupSelection::All)]
    rollup: RollupSelection,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[arg(long, value_enum)]
    tier: TierSelection,
    /// Expected run ids. Defaults to every configured scenario.
    #[arg(long = "expect", value_name = "RUN", num_args = 1..)]
    expect: Vec<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Write the Prometheus text exposition here once the run completes
    #[arg(long, value_name = "PATH")]
    metrics_out: Option<PathBuf>,
}

fn load_config(explicit: Option<&PathBuf>) -> Result<TwinConfig> {
    match explicit {
        Some(path) => TwinConfig::load(&[path]),
        None => {
            let loaded = TwinConfig::load_with_source(&CONFIG_CANDIDATES)?;
            eprintln!("using configuration {}", loaded.source.display());
            Ok(loaded.config)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing("wft-twinctl", &config.logging)?;
    let runner = TwinRunner::new(config)?;

    match cli.command {
        Commands::Simulate(args) => {
            for summary in runner.simulate(args.scenario.as_deref())? {
                println!(
                    "{}: {} rows ({} duplicates, {} missing wind, {} negative wind, {} power spikes)",
                    summary.sim_run_id,
                    summary.rows,
                    summary.injected.duplicates,
                    summary.injected.missing_wind,
                    summary.injected.negative_wind,
                    summary.injected.power_spikes
                );
            }
        }
        Commands::Curate => {
            let outcome = runner.curate()?;
            println!(
                "silver: {} rows written from {} read ({} duplicates removed, {} flagged)",
                outcome.rows_written,
                outcome.rows_read,
                outcome.duplicates_removed,
                outcome.range_violations
            );
        }
        Commands::Aggregate(args) => {
            for outcome in runner.aggregate(args.rollup)? {
                println!(
                    "{}: {} rows written",
                    outcome.location.display(),
                    outcome.rows_written
                );
            }
        }
        Commands::Verify(args) => {
            let expected = if args.expect.is_empty() {
                runner.config().run_ids()
            } else {
                args.expect
            };
            let runs = runner.verify(args.tier, &expected)?;
            println!("{:?}: {}", args.tier, runs.into_iter().collect::<Vec<_>>().join(", "));
        }
        Commands::Run(args) => {
            let report = runner.run()?;
            info!(
                scenarios = report.simulations.len(),
                curated = report.curation.rows_written,
                rollups = report.rollups.len(),
                "pipeline run complete"
            );
            println!(
                "bronze runs: {}",
                report.bronze_runs.into_iter().collect::<Vec<_>>().join(", ")
            );
            println!(
                "gold runs: {}",
                report.gold_runs.into_iter().collect::<Vec<_>>().join(", ")
            );
            if let Some(path) = args.metrics_out {
                fs::write(&path, runner.metrics().render()?)
                    .with_context(|| format!("failed to write metrics to {}", path.display()))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verify_with_multiple_runs() {
        let cli = Cli::parse_from([
            "wft-twinctl",
            "verify",
            "--tier",
            "gold",
            "--expect",
            "SIM-A",
            "SIM-B",
        ]);
        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.tier, TierSelection::Gold);
                assert_eq!(args.expect, vec!["SIM-A", "SIM-B"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn aggregate_defaults_to_all_rollups() {
        let cli = Cli::parse_from(["wft-twinctl", "--config", "x.toml", "aggregate"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Commands::Aggregate(AggregateArgs { rollup: RollupSelection::All })
        ));
    }
}
