//! In-memory store.

use std::sync::{Mutex, PoisonError};

use super::{check_revision, Commit, RoundStore, StoreError};
use crate::battle::BattleRecord;
use crate::round::{Round, Settlement};

#[derive(Debug, Default)]
struct Inner {
    round: Option<Round>,
    battles: Vec<BattleRecord>,
    settlements: Vec<Settlement>,
}

/// A store that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with an existing round.
    pub fn with_round(round: Round) -> Self {
        MemoryStore {
            inner: Mutex::new(Inner {
                round: Some(round),
                ..Inner::default()
            }),
        }
    }
}

impl RoundStore for MemoryStore {
    fn load(&self) -> Result<Option<Round>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.round.clone())
    }

    fn commit(&self, commit: Commit<'_>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        check_revision(commit.expected, inner.round.as_ref())?;
        inner.round = Some(commit.round.clone());
        if let Some(record) = commit.battle {
            inner.battles.push(record.clone());
        }
        if let Some(settlement) = commit.settlement {
            inner.settlements.push(settlement.clone());
        }
        Ok(())
    }

    fn battles(&self) -> Result<Vec<BattleRecord>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.battles.clone())
    }

    fn settlements(&self) -> Result<Vec<Settlement>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.settlements.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn round(revision: u64) -> Round {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Round::new(1, revision, t0, Duration::hours(24), 16)
    }

    #[test]
    fn first_commit_expects_nothing() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.commit(Commit::round(None, &round(0))).unwrap();
        assert_eq!(store.load().unwrap().map(|r| r.revision), Some(0));
    }

    #[test]
    fn stale_revision_conflicts() {
        let store = MemoryStore::with_round(round(3));
        let err = store.commit(Commit::round(Some(2), &round(3))).unwrap_err();
        assert!(err.is_conflict());
        let err = store.commit(Commit::round(None, &round(0))).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: None, found: Some(3) }));
        store.commit(Commit::round(Some(3), &round(4))).unwrap();
        assert_eq!(store.load().unwrap().map(|r| r.revision), Some(4));
    }

    #[test]
    fn rejected_commit_appends_nothing() {
        let store = MemoryStore::with_round(round(3));
        let next = round(4);
        let settlement = crate::round::settle(&next, next.started_at);
        assert!(store
            .commit(Commit::round(Some(1), &next).with_settlement(&settlement))
            .is_err());
        assert!(store.settlements().unwrap().is_empty());
        store
            .commit(Commit::round(Some(3), &next).with_settlement(&settlement))
            .unwrap();
        assert_eq!(store.settlements().unwrap(), vec![settlement]);
    }
}
