#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs scripted culture protocols on the bench.

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use vitro_bench::{query, Bench};
use vitro_core::{CompoundId, SimConfig, SpineLogEntry, VesselId};

/// Hours of culture between printed table rows.
const ROW_INTERVAL_H: f64 = 12.0;

/// Deterministic in-vitro culture bench.
#[derive(Debug, Parser)]
#[command(name = "vitro", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Top-level operations.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run a seed, dose, follow-up protocol and print culture rows.
    Run(RunArgs),
    /// Rebuild a run from a saved spine log and print the final state.
    Replay(ReplayArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
struct RunArgs {
    /// Seed for every random stream in the run.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Cell line to seed.
    #[arg(long, default_value = "a549")]
    cell_line: String,
    /// Vessel identifier; plate coordinates such as `A1` mark edge wells.
    #[arg(long, default_value = "B2")]
    vessel: String,
    /// Cells deposited at seeding.
    #[arg(long, default_value_t = 1.0e6)]
    count: f64,
    /// Carrying capacity of the vessel, in cells.
    #[arg(long, default_value_t = 1.0e7)]
    capacity: f64,
    /// Compound applied after the lead-in.
    #[arg(long, default_value = "staurosporine")]
    compound: String,
    /// Dose in micromolar.
    #[arg(long, default_value_t = 0.05)]
    dose_um: f64,
    /// Hours of culture before the dose.
    #[arg(long, default_value_t = 24.0)]
    lead_in_h: f64,
    /// Hours of culture after the dose.
    #[arg(long, default_value_t = 48.0)]
    follow_up_h: f64,
    /// Write the spine log to this path as JSON.
    #[arg(long)]
    log: Option<PathBuf>,
    /// JSON file replacing the built-in run configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Arguments for the `replay` subcommand.
#[derive(Debug, Args)]
struct ReplayArgs {
    /// Seed of the original run.
    #[arg(long)]
    seed: u64,
    /// Spine log written by `run --log`.
    #[arg(long)]
    log: PathBuf,
    /// JSON file replacing the built-in run configuration; must match the
    /// configuration of the original run.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Entry point for the vitro command-line interface.
fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Replay(args) => replay(args),
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut bench = Bench::new(load_config(args.config.as_deref())?, args.seed);
    let vessel = VesselId::new(args.vessel.clone());
    let seeded = bench.seed_vessel(
        vessel.clone(),
        &args.cell_line,
        args.count,
        args.capacity,
        1.0,
    )?;
    println!("{}", report::table_header());
    println!("{}", report::table_row(0.0, &seeded));
    culture(&mut bench, &vessel, args.lead_in_h)?;

    let compound = CompoundId::new(args.compound.clone());
    let treatment = bench.treat_with_compound(&vessel, &compound, args.dose_um, 1.0, 1.0)?;
    println!(
        "dosed {compound} at {:.3} uM: instant effect {:.3}, viability {:.3}",
        args.dose_um, treatment.viability_effect, treatment.current_viability
    );
    culture(&mut bench, &vessel, args.follow_up_h)?;

    println!();
    println!("{}", report::summary(&bench.vessel_state(&vessel)?));

    if let Some(path) = &args.log {
        let bytes =
            serde_json::to_vec_pretty(query::spine_log(&bench)).context("encode spine log")?;
        fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
        println!("spine log written to {}", path.display());
    }
    Ok(())
}

/// Loads the run configuration, built-in unless a file overrides it.
fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    match path {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("decode configuration {}", path.display()))
        }
        None => Ok(SimConfig::default()),
    }
}

/// Advances the bench, printing one culture row per interval.
fn culture(bench: &mut Bench, vessel: &VesselId, hours: f64) -> anyhow::Result<()> {
    let mut remaining = hours;
    while remaining > 0.0 {
        let dt = remaining.min(ROW_INTERVAL_H);
        bench.advance_time(dt)?;
        remaining -= dt;
        let state = bench.vessel_state(vessel)?;
        println!("{}", report::table_row(query::clock(bench).get(), &state));
    }
    Ok(())
}

fn replay(args: ReplayArgs) -> anyhow::Result<()> {
    let bytes = fs::read(&args.log).with_context(|| format!("read {}", args.log.display()))?;
    let log: Vec<SpineLogEntry> = serde_json::from_slice(&bytes).context("decode spine log")?;
    let bench = Bench::replay(load_config(args.config.as_deref())?, args.seed, &log)?;
    println!(
        "replayed {} log entries to t = {:.1} h",
        log.len(),
        query::clock(&bench).get()
    );
    for vessel in query::vessel_ids(&bench) {
        println!();
        println!("{}", report::summary(&query::vessel_state(&bench, &vessel)?));
    }
    Ok(())
}
