use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rule184_traffic::simulation::{BoundaryMode, LaneFill, SimParams, Simulation, Topology};

/// Road layouts available from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// One lane at 30% density
    Single,
    /// Two parallel lanes
    Double,
    /// Two opposing two-lane roads
    TwoWay,
    /// Four two-lane roads sharing an intersection
    Crossroads,
}

#[derive(Parser)]
#[command(name = "rule184_traffic")]
#[command(about = "Rule 184 cellular-automaton traffic simulation")]
struct Cli {
    /// Road layout to simulate
    #[arg(long, value_enum, default_value = "crossroads")]
    preset: Preset,

    /// Load the road layout from a JSON file instead of a preset
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Edge handling: toroid or null
    #[arg(long, default_value = "toroid")]
    boundary: BoundaryMode,

    /// Number of generations to run
    #[arg(long, default_value = "200")]
    generations: u64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Cells per lane for the presets
    #[arg(long, default_value = "40")]
    length: usize,

    /// JSON file with simulation parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Override one parameter, e.g. --set breakdown_prob=0.1
    #[arg(long = "set", value_parser = parse_assignment)]
    overrides: Vec<(String, f64)>,

    /// Generations per second, 0 runs unthrottled
    #[arg(long, default_value = "0")]
    speed: f64,

    /// Print the map every N generations, 0 prints only the start and end
    #[arg(long, default_value = "50")]
    print_every: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in the terminal
fn run_headless(cli: &Cli) -> Result<()> {
    if !(cli.speed.is_finite() && cli.speed >= 0.0) {
        bail!("--speed must be a non-negative number, got {}", cli.speed);
    }

    let topology = match &cli.topology {
        Some(path) => load_topology(path)?,
        None => preset_topology(cli.preset, cli.length),
    };
    let mut params = match &cli.params {
        Some(path) => load_params(path)?,
        None => SimParams::default(),
    };
    for (name, value) in &cli.overrides {
        params
            .set(name, *value)
            .with_context(|| format!("Invalid --set {}={}", name, value))?;
    }

    let mut sim = Simulation::with_params(topology, cli.boundary, params, cli.seed)
        .context("Failed to build simulation")?;

    println!("Running Rule 184 traffic simulation in headless mode...");
    println!(
        "Generations: {}, boundary: {}, seed: {}",
        cli.generations,
        cli.boundary,
        cli.seed.map_or_else(|| "random".to_string(), |s| s.to_string())
    );
    println!();
    println!("Initial state:");
    print!("{}", sim.summary());
    print!("{}", sim.render_map());
    println!();

    let pause = (cli.speed > 0.0).then(|| Duration::from_secs_f64(1.0 / cli.speed));
    for _ in 0..cli.generations {
        sim.step()
            .with_context(|| format!("Generation {} failed", sim.generation() + 1))?;

        if cli.print_every > 0 && sim.generation() % cli.print_every == 0 {
            println!("--- After generation {} ---", sim.generation());
            print!("{}", sim.summary());
            print!("{}", sim.render_map());
            println!();
        }
        if let Some(pause) = pause {
            std::thread::sleep(pause);
        }
    }

    println!("=== Final State ===");
    print!("{}", sim.summary());
    print!("{}", sim.render_map());

    info!("=== SIMULATION COMPLETE ===");
    sim.stats().log_summary(sim.generation(), sim.vehicle_count());
    Ok(())
}

fn preset_topology(preset: Preset, length: usize) -> Topology {
    match preset {
        Preset::Single => Topology::single_lane(length, LaneFill::Density(0.3)),
        Preset::Double => Topology::double_lane(length),
        Preset::TwoWay => Topology::two_way(length),
        Preset::Crossroads => Topology::crossroads(length, length),
    }
}

fn load_topology(path: &Path) -> Result<Topology> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read topology file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse topology file {}", path.display()))
}

fn load_params(path: &Path) -> Result<SimParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameter file {}", path.display()))?;
    let params: SimParams = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse parameter file {}", path.display()))?;
    params
        .validate()
        .with_context(|| format!("Invalid parameters in {}", path.display()))?;
    Ok(params)
}

/// Parse `name=value` for `--set`
fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.trim().to_string(), value))
}
