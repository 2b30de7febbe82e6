//! Persistent storage of the current round and the append-only logs.
//!
//! The store holds exactly one current `Round` and is updated only through
//! compare-and-swap on the round's revision, which is what linearizes
//! transitions across processes sharing a store. Battle records and
//! settlements are appended in the same commit as the round they belong to.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::battle::BattleRecord;
use crate::round::{Round, Settlement};

/// Errors raised by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("round revision conflict: expected {expected:?}, found {found:?}")]
    Conflict { expected: Option<u64>, found: Option<u64> },

    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("store codec: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// One atomic update: the next round snapshot plus any log entries.
#[derive(Debug, Clone, Copy)]
pub struct Commit<'a> {
    /// Revision of the round the update was computed from; `None` when no
    /// round existed yet.
    pub expected: Option<u64>,
    pub round: &'a Round,
    pub battle: Option<&'a BattleRecord>,
    pub settlement: Option<&'a Settlement>,
}

impl<'a> Commit<'a> {
    pub fn round(expected: Option<u64>, round: &'a Round) -> Self {
        Commit {
            expected,
            round,
            battle: None,
            settlement: None,
        }
    }

    pub fn with_battle(mut self, record: &'a BattleRecord) -> Self {
        self.battle = Some(record);
        self
    }

    pub fn with_settlement(mut self, settlement: &'a Settlement) -> Self {
        self.settlement = Some(settlement);
        self
    }
}

/// Durable storage required by the round manager.
pub trait RoundStore: Send + Sync {
    /// Loads the current round, if one has ever been committed.
    fn load(&self) -> Result<Option<Round>, StoreError>;

    /// Replaces the current round if its revision still equals
    /// `commit.expected`, appending the commit's log entries atomically.
    fn commit(&self, commit: Commit<'_>) -> Result<(), StoreError>;

    fn battles(&self) -> Result<Vec<BattleRecord>, StoreError>;

    fn settlements(&self) -> Result<Vec<Settlement>, StoreError>;
}

pub(crate) fn check_revision(expected: Option<u64>, current: Option<&Round>) -> Result<(), StoreError> {
    let found = current.map(|r| r.revision);
    if found == expected {
        Ok(())
    } else {
        Err(StoreError::Conflict { expected, found })
    }
}
