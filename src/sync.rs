//! Change notification and observer-side snapshot mirroring.
//!
//! The round manager publishes the full round after every committed
//! transition. Delivery is best-effort and may repeat, so observers replace
//! their state wholesale and ignore anything older than what they hold.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::battle::BattleRecord;
use crate::board::{CellIndex, UnitId};
use crate::round::{Round, Settlement};
use crate::store::{RoundStore, StoreError};

/// What caused a published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    RoundStarted,
    Placed { cell: CellIndex, unit: UnitId },
    ChallengeOpened { cell: CellIndex, attacker: UnitId },
    BattleResolved { record: BattleRecord, board_changed: bool },
    Settled { settlement: Settlement },
    CooldownsPurged { purged: usize },
}

/// A committed transition and the full round state after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub transition: Transition,
    pub snapshot: Round,
}

/// Receives every committed transition.
pub trait ChangeSink: Send + Sync {
    fn publish(&self, event: &ChangeEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn publish(&self, _event: &ChangeEvent) {}
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers may lag and lose events; since every event carries a
/// full snapshot, the next one they do receive brings them up to date.
#[derive(Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        BroadcastSink { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl ChangeSink for BroadcastSink {
    fn publish(&self, event: &ChangeEvent) {
        // No subscribers is not an error.
        if self.tx.send(event.clone()).is_err() {
            debug!(revision = event.snapshot.revision, "no subscribers for change event");
        }
    }
}

/// An observer's copy of the current round.
#[derive(Debug, Default)]
pub struct RoundMirror {
    current: Mutex<Option<Round>>,
}

impl RoundMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held round with `snapshot` unless it is older.
    /// Returns whether the snapshot was taken.
    pub fn apply(&self, snapshot: &Round) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|r| r.revision > snapshot.revision) {
            return false;
        }
        *current = Some(snapshot.clone());
        true
    }

    /// Reloads from the store, which is the source of truth on reconnect.
    pub fn resync(&self, store: &dyn RoundStore) -> Result<(), StoreError> {
        let latest = store.load()?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = latest;
        Ok(())
    }

    pub fn current(&self) -> Option<Round> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Applies events from a subscription until the sender goes away.
    pub async fn follow(&self, mut rx: broadcast::Receiver<ChangeEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    self.apply(&event.snapshot);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "mirror lagged behind change events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

impl ChangeSink for RoundMirror {
    fn publish(&self, event: &ChangeEvent) {
        self.apply(&event.snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Commit, MemoryStore};
    use chrono::{Duration, TimeZone, Utc};

    fn round(revision: u64) -> Round {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Round::new(1, revision, t0, Duration::hours(24), 8)
    }

    #[test]
    fn mirror_replaces_and_ignores_older() {
        let mirror = RoundMirror::new();
        assert!(mirror.apply(&round(2)));
        assert!(mirror.apply(&round(2)));
        assert!(!mirror.apply(&round(1)));
        assert_eq!(mirror.current().map(|r| r.revision), Some(2));
        assert!(mirror.apply(&round(5)));
        assert_eq!(mirror.current().map(|r| r.revision), Some(5));
    }

    #[test]
    fn resync_takes_store_state() {
        let store = MemoryStore::new();
        store.commit(Commit::round(None, &round(0))).unwrap();
        let mirror = RoundMirror::new();
        mirror.apply(&round(9));
        mirror.resync(&store).unwrap();
        assert_eq!(mirror.current().map(|r| r.revision), Some(0));
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        let event = ChangeEvent {
            transition: Transition::RoundStarted,
            snapshot: round(0),
        };
        sink.publish(&event);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn mirror_follows_broadcast() {
        let sink = BroadcastSink::new(8);
        let rx = sink.subscribe();
        for revision in 0..3 {
            sink.publish(&ChangeEvent {
                transition: Transition::RoundStarted,
                snapshot: round(revision),
            });
        }
        drop(sink);
        let mirror = RoundMirror::new();
        mirror.follow(rx).await;
        assert_eq!(mirror.current().map(|r| r.revision), Some(2));
    }
}
