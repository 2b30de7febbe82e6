//! Round lifecycle: expiry, settlement and rollover.
//!
//! Flow:
//! - Active  -> Active   on every accepted placement or challenge
//! - Active  -> Expired  once `now >= ends_at`
//! - Expired -> settled, and a fresh Active round takes its place
//!
//! Settlement waits for pending battles to finish so their outcome lands on
//! the board being settled.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Round, RoundStatus};
use crate::board::{Faction, Tally};

/// The outcome of a retired round. Emitted exactly once per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub round_id: u64,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub settled_at: DateTime<Utc>,
    pub tally: Tally,
    /// `None` when no faction held any cell.
    pub winner: Option<Faction>,
}

/// What an expiry evaluation concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// The round is still running.
    Active,
    /// The round has ended but a battle on it is still pending.
    Deferred,
    /// The round is retired with this settlement and replaced by `next`.
    Settle { settlement: Settlement, next: Box<Round> },
}

/// Determines the settlement of a round from its board.
pub fn settle(round: &Round, now: DateTime<Utc>) -> Settlement {
    let tally = round.board.count_by_faction();
    Settlement {
        round_id: round.id,
        started_at: round.started_at,
        ends_at: round.ends_at,
        settled_at: now,
        winner: tally.leader(),
        tally,
    }
}

/// Creates the round that follows `round`.
///
/// The board, used set and contests start empty. Cooldowns are unit-scoped
/// and carry forward unpurged.
pub fn successor(round: &Round, now: DateTime<Utc>, duration: Duration) -> Round {
    let mut next = Round::new(round.id + 1, round.revision + 1, now, duration, round.board.len());
    next.cooldowns = round.cooldowns.clone();
    next
}

/// Evaluates whether `round` has expired and, if so, settles it.
///
/// Pure: safe to call at any cadence and from any trigger. Settling twice is
/// prevented by the caller committing `next` with compare-and-swap.
pub fn evaluate_expiry(round: &Round, now: DateTime<Utc>, duration: Duration, lease: Duration) -> Expiry {
    if round.status(now) == RoundStatus::Active {
        return Expiry::Active;
    }
    if round.has_live_contests(now, lease) {
        return Expiry::Deferred;
    }
    let mut retired = round.clone();
    retired.active = false;
    Expiry::Settle {
        settlement: settle(&retired, now),
        next: Box::new(successor(&retired, now, duration)),
    }
}
