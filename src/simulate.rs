//! Batch simulation of isolated rounds.
//!
//! Each simulated round gets its own manager, in-memory store, manual clock
//! and a random oracle that fails a share of its calls. Random agents
//! place and challenge until the round runs out, then the round is settled.
//! Rounds are independent, so they run in parallel with rayon.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::battle::{Adjudication, RandomOracle};
use crate::board::{Faction, Side, Tally, Unit, ALL_FACTIONS, FACTION_COUNT};
use crate::clock::ManualClock;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::manager::RoundManager;
use crate::store::MemoryStore;
use crate::sync::NullSink;

/// Errors that stop a simulated round.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("failed to build async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("round {0} ended without a settlement")]
    Unsettled(usize),

    #[error("{0} turns do not fit in a round")]
    TooManyTurns(usize),
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of rounds to play.
    pub rounds: usize,
    /// Agent actions attempted per round.
    pub turns: usize,
    /// Units each faction fields.
    pub units_per_faction: usize,
    /// Share of oracle calls that fail and fall back to a coin flip.
    pub failure_rate: f64,
    /// Worker threads; 1 plays rounds sequentially.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Game rules for every round.
    pub game: GameConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            rounds: 10,
            turns: 200,
            units_per_faction: 16,
            failure_rate: 0.1,
            threads: 4,
            seed: 0,
            game: GameConfig::default(),
        }
    }
}

/// The result of one simulated round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub index: usize,
    pub winner: Option<Faction>,
    pub tally: Tally,
    pub placements: usize,
    pub challenges: usize,
    /// Actions refused by validation.
    pub rejected: usize,
    pub attacker_wins: usize,
    pub fallback_battles: usize,
}

/// Plays one isolated round to settlement.
pub fn play_round(config: &SimulationConfig, index: usize, rng: &mut SmallRng) -> Result<RoundReport, SimulationError> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(play_round_async(config, index, rng))
}

async fn play_round_async(
    config: &SimulationConfig,
    index: usize,
    rng: &mut SmallRng,
) -> Result<RoundReport, SimulationError> {
    let clock = Arc::new(ManualClock::new(epoch()));
    let game = GameConfig {
        rng_seed: rng.gen::<u64>() | 1,
        ..config.game.clone()
    };
    let round_duration = game.round_duration();
    let slots = i32::try_from(config.turns)
        .ok()
        .and_then(|turns| turns.checked_add(1))
        .ok_or(SimulationError::TooManyTurns(config.turns))?;
    let step = round_duration / slots;
    let oracle = RandomOracle::new(rng.gen::<u64>() | 1, config.failure_rate);
    let manager = Arc::new(RoundManager::new(
        game,
        oracle,
        Arc::new(MemoryStore::new()),
        Arc::new(NullSink),
        clock.clone(),
    ));

    let roster: Vec<Unit> = ALL_FACTIONS
        .iter()
        .flat_map(|&faction| {
            (1..=config.units_per_faction).map(move |n| Unit::bare(format!("{}-{n}", faction.name()), faction))
        })
        .collect();

    let mut report = RoundReport {
        index,
        winner: None,
        tally: Tally::default(),
        placements: 0,
        challenges: 0,
        rejected: 0,
        attacker_wins: 0,
        fallback_battles: 0,
    };

    for _ in 0..config.turns {
        clock.advance(step);
        let round = manager.current_round()?;
        let now = manager.now();
        let faction = ALL_FACTIONS[rng.gen_range(0..FACTION_COUNT)];
        let candidates: Vec<&Unit> = roster
            .iter()
            .filter(|u| u.faction == faction && round.check_unit_available(&u.id, now).is_ok())
            .collect();
        let Some(unit) = candidates.choose(rng).copied() else {
            continue;
        };
        let cell = rng.gen_range(0..round.board.len());
        let target = round.board.cell(cell).map_err(GameError::from)?;
        let result = match target.owning_faction() {
            None => manager.place(cell, unit).map(|_| {
                report.placements += 1;
            }),
            Some(owner) if owner != faction => manager.challenge(cell, unit).await.map(|outcome| {
                report.challenges += 1;
                if outcome.record.winner == Side::Attacker {
                    report.attacker_wins += 1;
                }
                if outcome.record.adjudication == Adjudication::Fallback {
                    report.fallback_battles += 1;
                }
            }),
            Some(_) => continue,
        };
        if let Err(e) = result {
            debug!(round = index, error = %e, "action rejected");
            report.rejected += 1;
        }
    }

    clock.advance(round_duration);
    let settlement = manager
        .evaluate_expiry()?
        .ok_or(SimulationError::Unsettled(index))?;
    report.winner = settlement.winner;
    report.tally = settlement.tally;
    Ok(report)
}

/// Runs every round, in parallel when `config.threads > 1`. Reports come
/// back in round order.
pub fn run_simulation(config: &SimulationConfig) -> Result<Vec<RoundReport>, SimulationError> {
    if config.threads > 1 {
        run_parallel(config)
    } else {
        let mut rng = seeded(config.seed, 0);
        (0..config.rounds).map(|i| play_round(config, i, &mut rng)).collect()
    }
}

fn run_parallel(config: &SimulationConfig) -> Result<Vec<RoundReport>, SimulationError> {
    use rayon::prelude::*;

    let completed = AtomicUsize::new(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| SimulationError::Runtime(std::io::Error::other(e)))?;

    pool.install(|| {
        (0..config.rounds)
            .into_par_iter()
            .map(|i| {
                let mut rng = seeded(config.seed, i);
                let report = play_round(config, i, &mut rng)?;
                let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    round = i,
                    done = n,
                    total = config.rounds,
                    winner = report.winner.map(Faction::name).unwrap_or("none"),
                    "round simulated"
                );
                Ok(report)
            })
            .collect()
    })
}

fn seeded(seed: u64, index: usize) -> SmallRng {
    if seed != 0 {
        SmallRng::seed_from_u64(seed.wrapping_add(index as u64))
    } else {
        SmallRng::from_entropy()
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
}

/// Writes reports as JSON lines.
pub fn write_jsonl<W: Write>(reports: &[RoundReport], out: &mut W) -> std::io::Result<()> {
    for report in reports {
        serde_json::to_writer(&mut *out, report)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Aggregate figures over a set of reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub rounds: usize,
    pub wins: [usize; FACTION_COUNT],
    pub no_winner: usize,
    pub battles: usize,
    pub fallback_battles: usize,
    pub rejected: usize,
}

impl Summary {
    pub fn from_reports(reports: &[RoundReport]) -> Self {
        let mut summary = Summary {
            rounds: reports.len(),
            ..Summary::default()
        };
        for report in reports {
            match report.winner {
                Some(f) => summary.wins[f as usize] += 1,
                None => summary.no_winner += 1,
            }
            summary.battles += report.challenges;
            summary.fallback_battles += report.fallback_battles;
            summary.rejected += report.rejected;
        }
        summary
    }

    pub fn fallback_ratio(&self) -> f64 {
        self.fallback_battles as f64 / self.battles.max(1) as f64
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Summary ===")?;
        writeln!(f, "Rounds: {}", self.rounds)?;
        writeln!(f, "Battles: {} ({:.1}% fallback)", self.battles, 100.0 * self.fallback_ratio())?;
        writeln!(f, "Rejected actions: {}", self.rejected)?;
        writeln!(f, "No winner: {}", self.no_winner)?;
        writeln!(f, "Win distribution:")?;
        for faction in ALL_FACTIONS {
            let wins = self.wins[faction as usize];
            let pct = 100.0 * wins as f64 / self.rounds.max(1) as f64;
            writeln!(f, "  {:>6}: {} ({:.1}%)", faction.name(), wins, pct)?;
        }
        Ok(())
    }
}
