//! Round state and its validate-then-mutate transitions.
//!
//! Every transition here is synchronous and operates on an owned `Round`
//! value. Callers load a snapshot, apply a transition, and commit the result
//! as a whole, so a failed transition never leaves partial changes behind.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::BattleRecord;
use crate::board::{Board, CellIndex, Combatant, Side, Unit, UnitId};
use crate::cooldown::CooldownLedger;
use crate::error::GameError;

/// A cell with a battle awaiting its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    pub attacker: UnitId,
    pub since: DateTime<Utc>,
}

/// Where a round is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Active,
    Expired,
}

/// One timed instance of the contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: u64,
    /// Bumped on every committed transition; the compare-and-swap token.
    pub revision: u64,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub board: Board,
    pub used_units: BTreeSet<UnitId>,
    pub cooldowns: CooldownLedger,
    #[serde(default)]
    pub contests: BTreeMap<CellIndex, Contest>,
    /// Cleared once at settlement; a retired round never reactivates.
    pub active: bool,
}

impl Round {
    /// Creates a round with an empty board starting at `now`.
    pub fn new(id: u64, revision: u64, now: DateTime<Utc>, duration: Duration, board_size: usize) -> Self {
        Round {
            id,
            revision,
            started_at: now,
            ends_at: now + duration,
            board: Board::empty(board_size),
            used_units: BTreeSet::new(),
            cooldowns: CooldownLedger::new(),
            contests: BTreeMap::new(),
            active: true,
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> RoundStatus {
        if self.active && now < self.ends_at {
            RoundStatus::Active
        } else {
            RoundStatus::Expired
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == RoundStatus::Active
    }

    fn ensure_active(&self, now: DateTime<Utc>) -> Result<(), GameError> {
        if self.is_active(now) {
            Ok(())
        } else {
            Err(GameError::RoundNotActive(self.id))
        }
    }

    fn ensure_uncontested(&self, cell: CellIndex) -> Result<(), GameError> {
        if self.contests.contains_key(&cell) {
            Err(GameError::CellContested(cell))
        } else {
            Ok(())
        }
    }

    /// True if the unit is the attacker in a pending battle.
    pub fn is_busy(&self, unit: &UnitId) -> bool {
        self.contests.values().any(|c| &c.attacker == unit)
    }

    /// Checks that a unit may be placed or sent into battle right now.
    pub fn check_unit_available(&self, unit: &UnitId, now: DateTime<Utc>) -> Result<(), GameError> {
        if self.used_units.contains(unit) {
            return Err(crate::board::BoardError::UnitAlreadyUsed(unit.clone()).into());
        }
        if let Some(remaining) = self.cooldowns.remaining(unit, now) {
            return Err(GameError::UnitOnCooldown {
                unit: unit.clone(),
                remaining_secs: remaining.num_seconds(),
            });
        }
        if self.is_busy(unit) {
            return Err(GameError::UnitBusy(unit.clone()));
        }
        Ok(())
    }

    /// Places `unit` on `cell` for the unit's faction.
    pub fn place(&mut self, cell: CellIndex, unit: &Unit, now: DateTime<Utc>) -> Result<(), GameError> {
        self.ensure_active(now)?;
        self.ensure_uncontested(cell)?;
        self.check_unit_available(&unit.id, now)?;
        self.board.place_unit(cell, unit, unit.faction)?;
        self.used_units.insert(unit.id.clone());
        Ok(())
    }

    /// Validates a challenge, marks the cell contested, and returns the
    /// attacker and defender snapshots for the battle.
    pub fn open_challenge(
        &mut self,
        cell: CellIndex,
        attacker: &Unit,
        now: DateTime<Utc>,
    ) -> Result<(Combatant, Combatant), GameError> {
        self.ensure_active(now)?;
        self.ensure_uncontested(cell)?;
        self.check_unit_available(&attacker.id, now)?;
        let defender = self.board.challenge_cell(cell, attacker, attacker.faction)?;
        self.contests.insert(
            cell,
            Contest {
                attacker: attacker.id.clone(),
                since: now,
            },
        );
        let attacker = Combatant {
            unit: attacker.clone(),
            faction: attacker.faction,
        };
        Ok((attacker, defender))
    }

    /// Releases the contest and applies a concluded battle to the board.
    ///
    /// `opened_at` identifies the contest the battle was fought under; a
    /// contest reopened after its lease lapsed is left alone. The board only
    /// changes when the attacker won, the battle belongs to this round, its
    /// contest is still held, and the defender still holds the cell.
    /// Returns whether the board changed.
    pub fn finish_challenge(&mut self, record: &BattleRecord, opened_at: DateTime<Utc>) -> bool {
        let held = match self.contests.get(&record.cell) {
            Some(c) if c.attacker == record.attacker.unit.id && c.since == opened_at => {
                self.contests.remove(&record.cell);
                true
            }
            _ => false,
        };
        if record.winner != Side::Attacker || record.round_id != self.id || !held {
            return false;
        }
        let defender_holds = self
            .board
            .cell(record.cell)
            .ok()
            .and_then(|c| c.unit())
            .is_some_and(|u| u.id == record.defender.unit.id);
        if !defender_holds {
            return false;
        }
        let attacker = &record.attacker;
        if self
            .board
            .apply_battle_outcome(record.cell, &attacker.unit, attacker.faction, Side::Attacker)
            .is_err()
        {
            return false;
        }
        self.used_units.insert(attacker.unit.id.clone());
        true
    }

    /// Drops contests older than `lease`. Returns how many were dropped.
    pub fn clear_stale_contests(&mut self, now: DateTime<Utc>, lease: Duration) -> usize {
        let before = self.contests.len();
        self.contests.retain(|_, c| now - c.since < lease);
        before - self.contests.len()
    }

    /// True if some contest is younger than `lease`.
    pub fn has_live_contests(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        self.contests.values().any(|c| now - c.since < lease)
    }
}
