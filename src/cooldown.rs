//! Cooldown ledger.
//!
//! Tracks, per unit, the instant until which it may not be placed or sent
//! into battle. Entries are unit-scoped and survive round rollover.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::board::UnitId;

/// One unit's cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub unit: UnitId,
    pub expires_at: DateTime<Utc>,
}

/// At most one entry per unit; inserting replaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooldownLedger {
    entries: BTreeMap<UnitId, DateTime<Utc>>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the unit has an entry expiring strictly after `now`.
    pub fn is_on_cooldown(&self, unit: &UnitId, now: DateTime<Utc>) -> bool {
        self.entries.get(unit).is_some_and(|&t| t > now)
    }

    /// Time left before the unit is available again.
    pub fn remaining(&self, unit: &UnitId, now: DateTime<Utc>) -> Option<Duration> {
        self.entries
            .get(unit)
            .filter(|&&t| t > now)
            .map(|&t| t - now)
    }

    /// Sets the unit's cooldown, replacing any existing entry.
    pub fn set(&mut self, unit: UnitId, expires_at: DateTime<Utc>) {
        self.entries.insert(unit, expires_at);
    }

    /// Removes every entry with `expires_at <= now`. Returns how many went.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, t| *t > now);
        before - self.entries.len()
    }

    /// Number of entries, live or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in unit-id order.
    pub fn entries(&self) -> impl Iterator<Item = CooldownEntry> + '_ {
        self.entries.iter().map(|(unit, &expires_at)| CooldownEntry {
            unit: unit.clone(),
            expires_at,
        })
    }

    /// Units still cooling down at `now`.
    pub fn live(&self, now: DateTime<Utc>) -> impl Iterator<Item = &UnitId> + '_ {
        self.entries
            .iter()
            .filter(move |(_, &t)| t > now)
            .map(|(unit, _)| unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn cooldown_is_live_until_expiry() {
        let mut ledger = CooldownLedger::new();
        let unit = UnitId::from("U1");
        ledger.set(unit.clone(), t0() + Duration::hours(2));

        assert!(ledger.is_on_cooldown(&unit, t0()));
        assert_eq!(ledger.remaining(&unit, t0()), Some(Duration::hours(2)));
        assert!(ledger.is_on_cooldown(&unit, t0() + Duration::minutes(119)));
        // Expiry instant itself is no longer on cooldown.
        assert!(!ledger.is_on_cooldown(&unit, t0() + Duration::hours(2)));
        assert_eq!(ledger.remaining(&unit, t0() + Duration::hours(2)), None);
    }

    #[test]
    fn unknown_unit_is_not_on_cooldown() {
        let ledger = CooldownLedger::new();
        assert!(!ledger.is_on_cooldown(&UnitId::from("U9"), t0()));
        assert_eq!(ledger.remaining(&UnitId::from("U9"), t0()), None);
    }

    #[test]
    fn set_replaces_existing_entry() {
        let mut ledger = CooldownLedger::new();
        let unit = UnitId::from("U1");
        ledger.set(unit.clone(), t0() + Duration::hours(2));
        ledger.set(unit.clone(), t0() + Duration::minutes(30));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.remaining(&unit, t0()), Some(Duration::minutes(30)));
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let mut ledger = CooldownLedger::new();
        ledger.set(UnitId::from("old"), t0() - Duration::seconds(1));
        ledger.set(UnitId::from("edge"), t0());
        ledger.set(UnitId::from("live"), t0() + Duration::seconds(1));

        assert_eq!(ledger.purge_expired(t0()), 2);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_on_cooldown(&UnitId::from("live"), t0()));
    }

    #[test]
    fn purge_is_idempotent() {
        let mut ledger = CooldownLedger::new();
        ledger.set(UnitId::from("a"), t0() - Duration::hours(1));
        ledger.set(UnitId::from("b"), t0() + Duration::hours(1));

        ledger.purge_expired(t0());
        let once = ledger.clone();
        assert_eq!(ledger.purge_expired(t0()), 0);
        assert_eq!(ledger, once);
    }

    #[test]
    fn live_lists_units_on_cooldown() {
        let mut ledger = CooldownLedger::new();
        ledger.set(UnitId::from("a"), t0() - Duration::hours(1));
        ledger.set(UnitId::from("b"), t0() + Duration::hours(1));
        let live: Vec<&UnitId> = ledger.live(t0()).collect();
        assert_eq!(live, vec![&UnitId::from("b")]);
    }
}
