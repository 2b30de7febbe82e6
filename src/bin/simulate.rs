//! Round simulation CLI.
//!
//! Plays isolated rounds with random agents and a flaky random oracle, and
//! writes one JSON line per round plus a summary on stderr.
//!
//! Usage:
//!   cargo run --release --bin simulate -- [OPTIONS]

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;

use bearfront::config::GameConfig;
use bearfront::simulate::{self, SimulationConfig, Summary};

#[derive(Parser, Debug)]
#[command(version, about = "Simulate isolated bearfront rounds")]
struct Args {
    /// Number of rounds to play.
    #[arg(long, default_value_t = 10)]
    rounds: usize,

    /// Agent actions attempted per round.
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(..=1_000_000))]
    turns: u32,

    /// Units each faction fields.
    #[arg(long, default_value_t = 16)]
    units: usize,

    /// Share of oracle calls that fail.
    #[arg(long, default_value_t = 0.1)]
    failure_rate: f64,

    /// Number of parallel threads.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Random seed, 0 for entropy.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// TOML game configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress the summary.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::ERROR.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let game = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let config = SimulationConfig {
        rounds: args.rounds,
        turns: args.turns as usize,
        units_per_faction: args.units,
        failure_rate: args.failure_rate.clamp(0.0, 1.0),
        threads: args.threads.max(1),
        seed: args.seed,
        game,
    };

    if !args.quiet {
        eprintln!(
            "Simulating {} rounds, {} turns, {} units/faction, {:.0}% oracle failures, {} threads",
            config.rounds,
            config.turns,
            config.units_per_faction,
            100.0 * config.failure_rate,
            config.threads
        );
    }

    let start = Instant::now();
    let reports = simulate::run_simulation(&config)?;
    let elapsed = start.elapsed();

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            simulate::write_jsonl(&reports, &mut writer)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            simulate::write_jsonl(&reports, &mut writer)?;
        }
    }

    if !args.quiet {
        eprintln!("Completed {} rounds in {:.1}s", reports.len(), elapsed.as_secs_f64());
        eprint!("{}", Summary::from_reports(&reports));
    }
    Ok(())
}
