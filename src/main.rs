//! Bearfront -- a faction territory-control round server speaking a line
//! protocol.
//!
//! Reads commands from stdin and writes `ok ...` / `error <kind> <message>`
//! responses to stdout. Logs go to stderr.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

use bearfront::battle::{DecisionOracle, FixedOracle, OfflineOracle, OracleError, RandomOracle};
use bearfront::board::{Side, UnitId};
use bearfront::catalog::{MemoryCatalog, UnitCatalog};
use bearfront::clock::SystemClock;
use bearfront::config::GameConfig;
use bearfront::manager::RoundManager;
use bearfront::session::Session;
use bearfront::store::{FileStore, MemoryStore, RoundStore};
use bearfront::sync::NullSink;

#[derive(Parser, Debug)]
#[command(version, about = "Faction territory-control round server")]
struct Args {
    /// TOML game configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the persistent round store; in-memory when absent.
    #[arg(short, long)]
    store_dir: Option<PathBuf>,

    /// JSON unit catalog; the demo catalog when absent.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Account to act as from the start.
    #[arg(short, long)]
    account: Option<String>,

    /// Battle decision oracle.
    #[arg(long, value_enum, default_value_t = OracleKind::Offline)]
    oracle: OracleKind,

    /// Share of calls the random oracle fails.
    #[arg(long, default_value_t = 0.1)]
    failure_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OracleKind {
    Offline,
    Attacker,
    Defender,
    Random,
}

/// The oracle selected on the command line.
enum CliOracle {
    Offline(OfflineOracle),
    Fixed(FixedOracle),
    Random(RandomOracle),
}

impl CliOracle {
    fn new(kind: OracleKind, seed: u64, failure_rate: f64) -> Self {
        match kind {
            OracleKind::Offline => CliOracle::Offline(OfflineOracle),
            OracleKind::Attacker => CliOracle::Fixed(FixedOracle(Side::Attacker)),
            OracleKind::Defender => CliOracle::Fixed(FixedOracle(Side::Defender)),
            OracleKind::Random => CliOracle::Random(RandomOracle::new(seed, failure_rate)),
        }
    }
}

impl DecisionOracle for CliOracle {
    async fn decide(&self, attacker: &UnitId, defender: &UnitId) -> Result<Side, OracleError> {
        match self {
            CliOracle::Offline(o) => o.decide(attacker, defender).await,
            CliOracle::Fixed(o) => o.decide(attacker, defender).await,
            CliOracle::Random(o) => o.decide(attacker, defender).await,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "bearfront failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let store: Arc<dyn RoundStore> = match &args.store_dir {
        Some(dir) => Arc::new(FileStore::open(dir)?),
        None => Arc::new(MemoryStore::new()),
    };
    let catalog: Arc<dyn UnitCatalog> = match &args.catalog {
        Some(path) => Arc::new(MemoryCatalog::load(path)?),
        None => Arc::new(MemoryCatalog::demo()),
    };
    let oracle = CliOracle::new(args.oracle, config.rng_seed, args.failure_rate);
    info!(
        board_size = config.board_size,
        round_secs = config.round_duration_secs,
        oracle = ?args.oracle,
        persistent = args.store_dir.is_some(),
        "starting"
    );

    let manager = Arc::new(RoundManager::new(
        config,
        oracle,
        store,
        Arc::new(NullSink),
        Arc::new(SystemClock),
    ));
    let watch = manager.spawn_expiry_watch();
    let mut session = Session::new(Arc::clone(&manager), catalog, args.account);

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !session.handle_line(&line, &mut out).await? {
            break;
        }
    }
    watch.abort();
    Ok(())
}
