//! The battle resolver.
//!
//! Deciding a battle is split from concluding it: `decide` is the only
//! suspension point in a challenge and runs outside any critical section,
//! while `conclude` mutates the cooldown ledger and must run inside one.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::oracle::{DecisionOracle, OracleError};
use super::record::{Adjudication, BattleRecord};
use crate::board::{CellIndex, Combatant, Side, UnitId};
use crate::config::GameConfig;
use crate::cooldown::CooldownLedger;

/// The decided winner of a battle and how it was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub winner: Side,
    pub adjudication: Adjudication,
}

/// Decides battles through an oracle with a coin-flip fallback.
pub struct BattleResolver<O> {
    oracle: O,
    timeout: Duration,
    cooldown: chrono::Duration,
    rng: Mutex<SmallRng>,
}

impl<O: DecisionOracle> BattleResolver<O> {
    pub fn new(oracle: O, config: &GameConfig) -> Self {
        let rng = if config.rng_seed != 0 {
            SmallRng::seed_from_u64(config.rng_seed)
        } else {
            SmallRng::from_entropy()
        };
        BattleResolver {
            oracle,
            timeout: config.oracle_timeout(),
            cooldown: config.cooldown(),
            rng: Mutex::new(rng),
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Asks the oracle once. Never fails: an error or a timeout falls back
    /// to an unweighted coin flip, recorded as `Adjudication::Fallback`.
    pub async fn decide(&self, attacker: &UnitId, defender: &UnitId) -> Verdict {
        let outcome = match tokio::time::timeout(self.timeout, self.oracle.decide(attacker, defender)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::TimedOut(self.timeout)),
        };
        match outcome {
            Ok(winner) => {
                debug!(%attacker, %defender, winner = winner.name(), "oracle decided battle");
                Verdict { winner, adjudication: Adjudication::Oracle }
            }
            Err(error) => {
                let verdict = self.coin_flip();
                warn!(
                    %attacker,
                    %defender,
                    %error,
                    winner = verdict.winner.name(),
                    "decision oracle failed, battle decided by coin flip"
                );
                verdict
            }
        }
    }

    fn coin_flip(&self) -> Verdict {
        let attacker_wins = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_bool(0.5);
        Verdict {
            winner: if attacker_wins { Side::Attacker } else { Side::Defender },
            adjudication: Adjudication::Fallback,
        }
    }

    /// Puts the loser on cooldown (replacing any prior entry) and returns
    /// the record of the battle.
    #[allow(clippy::too_many_arguments)]
    pub fn conclude(
        &self,
        ledger: &mut CooldownLedger,
        round_id: u64,
        cell: CellIndex,
        attacker: Combatant,
        defender: Combatant,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) -> BattleRecord {
        let record = BattleRecord {
            round_id,
            cell,
            attacker,
            defender,
            winner: verdict.winner,
            adjudication: verdict.adjudication,
            timestamp: now,
        };
        ledger.set(record.losing().unit.id.clone(), now + self.cooldown);
        record
    }

    /// Decides and concludes a battle in one step.
    pub async fn resolve(
        &self,
        ledger: &mut CooldownLedger,
        round_id: u64,
        cell: CellIndex,
        attacker: Combatant,
        defender: Combatant,
        now: DateTime<Utc>,
    ) -> BattleRecord {
        let verdict = self.decide(&attacker.unit.id, &defender.unit.id).await;
        self.conclude(ledger, round_id, cell, attacker, defender, verdict, now)
    }
}
