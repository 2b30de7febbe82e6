//! Round manager.
//!
//! Owns the authoritative round through a `RoundStore` and exposes the
//! placement and challenge operations. Every transition runs as one
//! critical section (load, validate, mutate, compare-and-swap commit,
//! publish). A challenge spans two such sections with the oracle call in
//! between; the target cell stays contested for that window.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::battle::{BattleRecord, BattleResolver, DecisionOracle, Verdict};
use crate::board::{CellIndex, Combatant, Unit};
use crate::catalog::UnitCatalog;
use crate::clock::Clock;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::round::{evaluate_expiry, Expiry, Round, Settlement};
use crate::store::{Commit, RoundStore};
use crate::sync::{ChangeEvent, ChangeSink, Transition};

/// The result of a completed challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOutcome {
    pub record: BattleRecord,
    /// False when the defender won (or the cell was no longer the one
    /// challenged); the board is then as it was.
    pub board_changed: bool,
}

/// The game service: one instance per shared round.
pub struct RoundManager<O> {
    config: GameConfig,
    resolver: BattleResolver<O>,
    store: Arc<dyn RoundStore>,
    sink: Arc<dyn ChangeSink>,
    clock: Arc<dyn Clock>,
    section: Mutex<()>,
}

impl<O: DecisionOracle> RoundManager<O> {
    pub fn new(
        config: GameConfig,
        oracle: O,
        store: Arc<dyn RoundStore>,
        sink: Arc<dyn ChangeSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        RoundManager {
            resolver: BattleResolver::new(oracle, &config),
            config,
            store,
            sink,
            clock,
            section: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RoundStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The current round, settling and rolling over first if it expired.
    pub fn current_round(&self) -> Result<Round, GameError> {
        self.with_retries(|| {
            let _section = self.enter();
            let now = self.clock.now();
            let current = self.load_or_start(now)?;
            match self.settle_locked(&current, now)? {
                Some((_, next)) => Ok(next),
                None => Ok(current),
            }
        })
    }

    /// Places `unit` on `cell` for the unit's faction.
    pub fn place(&self, cell: CellIndex, unit: &Unit) -> Result<Round, GameError> {
        let (_, round) = self.mutate(|round, now| {
            round.place(cell, unit, now)?;
            Ok((
                (),
                Transition::Placed {
                    cell,
                    unit: unit.id.clone(),
                },
            ))
        })?;
        info!(round = round.id, cell, unit = %unit.id, faction = %unit.faction, "unit placed");
        Ok(round)
    }

    /// Challenges the unit on `cell` with `attacker`.
    ///
    /// Once the cell is marked contested the battle runs on its own task, so
    /// dropping the returned future does not abandon it: the verdict is
    /// always recorded and the cell always released.
    pub async fn challenge(self: &Arc<Self>, cell: CellIndex, attacker: &Unit) -> Result<ChallengeOutcome, GameError>
    where
        O: 'static,
    {
        let ((round_id, opened_at, attacker, defender), _) = self.mutate(|round, now| {
            let (a, d) = round.open_challenge(cell, attacker, now)?;
            let transition = Transition::ChallengeOpened {
                cell,
                attacker: a.unit.id.clone(),
            };
            Ok(((round.id, now, a, d), transition))
        })?;
        debug!(round = round_id, cell, attacker = %attacker.unit.id, defender = %defender.unit.id, "challenge opened");

        let manager = Arc::clone(self);
        let battle = tokio::spawn(async move {
            let verdict = manager.resolver.decide(&attacker.unit.id, &defender.unit.id).await;
            manager.close_challenge(round_id, opened_at, cell, attacker, defender, verdict)
        });
        match battle.await {
            Ok(outcome) => outcome,
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(_) => Err(GameError::BattleInterrupted),
        }
    }

    /// Checks the round for expiry and settles it if due.
    ///
    /// Idempotent: a second call finds the fresh round and does nothing, so
    /// timers, push handlers and explicit requests may all call it.
    pub fn evaluate_expiry(&self) -> Result<Option<Settlement>, GameError> {
        self.with_retries(|| {
            let _section = self.enter();
            let now = self.clock.now();
            let current = self.load_or_start(now)?;
            Ok(self.settle_locked(&current, now)?.map(|(s, _)| s))
        })
    }

    /// Drops expired cooldown entries from the current round.
    pub fn purge_cooldowns(&self) -> Result<usize, GameError> {
        self.with_retries(|| {
            let _section = self.enter();
            let now = self.clock.now();
            let current = self.load_or_start(now)?;
            let mut next = current.clone();
            let purged = next.cooldowns.purge_expired(now);
            if purged == 0 {
                return Ok(0);
            }
            next.revision = current.revision + 1;
            self.store.commit(Commit::round(Some(current.revision), &next))?;
            debug!(round = next.id, purged, "expired cooldowns purged");
            self.publish(Transition::CooldownsPurged { purged }, &next);
            Ok(purged)
        })
    }

    /// Units the account may pick right now: owned, unused this round, not
    /// on cooldown, and not already in a battle.
    pub fn available_units(&self, catalog: &dyn UnitCatalog, account: &str) -> Result<Vec<Unit>, GameError> {
        let round = self.current_round()?;
        let now = self.clock.now();
        Ok(catalog
            .owned_units(account)
            .into_iter()
            .filter(|id| round.check_unit_available(id, now).is_ok())
            .filter_map(|id| catalog.unit(&id))
            .collect())
    }

    pub fn battles(&self) -> Result<Vec<BattleRecord>, GameError> {
        Ok(self.store.battles()?)
    }

    pub fn settlements(&self) -> Result<Vec<Settlement>, GameError> {
        Ok(self.store.settlements()?)
    }

    /// Runs `evaluate_expiry` and `purge_cooldowns` on a fixed period.
    pub fn spawn_expiry_watch(self: &Arc<Self>) -> JoinHandle<()>
    where
        O: 'static,
    {
        let manager = Arc::clone(self);
        let period = self.config.expiry_check_period();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(error) = manager.evaluate_expiry() {
                    warn!(%error, "periodic expiry check failed");
                }
                if let Err(error) = manager.purge_cooldowns() {
                    warn!(%error, "periodic cooldown purge failed");
                }
            }
        })
    }

    fn enter(&self) -> MutexGuard<'_, ()> {
        self.section.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retries `attempt` while it loses compare-and-swap races.
    fn with_retries<T>(&self, mut attempt: impl FnMut() -> Result<T, GameError>) -> Result<T, GameError> {
        let retries = self.config.commit_retries;
        for n in 1..=retries {
            match attempt() {
                Err(GameError::Store(e)) if e.is_conflict() => {
                    warn!(attempt = n, retries, error = %e, "commit conflict, revalidating");
                }
                other => return other,
            }
        }
        Err(GameError::StoreConflict(retries))
    }

    /// Validates and applies `op` to the active round and commits it.
    fn mutate<T>(
        &self,
        op: impl Fn(&mut Round, DateTime<Utc>) -> Result<(T, Transition), GameError>,
    ) -> Result<(T, Round), GameError> {
        self.with_retries(|| {
            let _section = self.enter();
            let now = self.clock.now();
            let current = self.load_or_start(now)?;
            if !current.is_active(now) {
                self.settle_locked(&current, now)?;
                return Err(GameError::RoundNotActive(current.id));
            }
            let mut next = current.clone();
            let stale = next.clear_stale_contests(now, self.config.contest_lease());
            if stale > 0 {
                warn!(round = next.id, stale, "cleared abandoned contests");
            }
            let (value, transition) = op(&mut next, now)?;
            next.revision = current.revision + 1;
            self.store.commit(Commit::round(Some(current.revision), &next))?;
            self.publish(transition, &next);
            Ok((value, next))
        })
    }

    /// Second half of a challenge: records the verdict and applies it.
    fn close_challenge(
        &self,
        round_id: u64,
        opened_at: DateTime<Utc>,
        cell: CellIndex,
        attacker: Combatant,
        defender: Combatant,
        verdict: Verdict,
    ) -> Result<ChallengeOutcome, GameError> {
        self.with_retries(|| {
            let _section = self.enter();
            let now = self.clock.now();
            let current = self.load_or_start(now)?;
            let mut next = current.clone();
            let record = self.resolver.conclude(
                &mut next.cooldowns,
                round_id,
                cell,
                attacker.clone(),
                defender.clone(),
                verdict,
                now,
            );
            let board_changed = next.finish_challenge(&record, opened_at);
            next.revision = current.revision + 1;
            self.store
                .commit(Commit::round(Some(current.revision), &next).with_battle(&record))?;
            info!(
                round = round_id,
                cell,
                attacker = %record.attacker.unit.id,
                defender = %record.defender.unit.id,
                winner = record.winner.name(),
                board_changed,
                "battle resolved"
            );
            self.publish(
                Transition::BattleResolved {
                    record: record.clone(),
                    board_changed,
                },
                &next,
            );
            // This battle may have been the last thing holding settlement back.
            if let Err(error) = self.settle_locked(&next, now) {
                warn!(%error, round = next.id, "settlement after battle failed");
            }
            Ok(ChallengeOutcome { record, board_changed })
        })
    }

    /// Loads the current round, committing a first one if none exists.
    fn load_or_start(&self, now: DateTime<Utc>) -> Result<Round, GameError> {
        if let Some(round) = self.store.load()? {
            return Ok(round);
        }
        let round = Round::new(1, 0, now, self.config.round_duration(), self.config.board_size);
        self.store.commit(Commit::round(None, &round))?;
        info!(round = round.id, ends_at = %round.ends_at, "first round started");
        self.publish(Transition::RoundStarted, &round);
        Ok(round)
    }

    /// Settles `current` if it has expired and nothing is pending on it.
    /// Returns the settlement and the round that replaced it.
    fn settle_locked(&self, current: &Round, now: DateTime<Utc>) -> Result<Option<(Settlement, Round)>, GameError> {
        match evaluate_expiry(current, now, self.config.round_duration(), self.config.contest_lease()) {
            Expiry::Active => Ok(None),
            Expiry::Deferred => {
                debug!(round = current.id, "round expired, waiting on pending battles");
                Ok(None)
            }
            Expiry::Settle { settlement, next } => {
                self.store.commit(
                    Commit::round(Some(current.revision), &next).with_settlement(&settlement),
                )?;
                info!(
                    round = settlement.round_id,
                    winner = settlement.winner.map(|f| f.name()).unwrap_or("none"),
                    cells = settlement.tally.total(),
                    next_round = next.id,
                    "round settled"
                );
                self.publish(
                    Transition::Settled {
                        settlement: settlement.clone(),
                    },
                    &next,
                );
                self.publish(Transition::RoundStarted, &next);
                Ok(Some((settlement, *next)))
            }
        }
    }

    fn publish(&self, transition: Transition, round: &Round) {
        self.sink.publish(&ChangeEvent {
            transition,
            snapshot: round.clone(),
        });
    }
}
