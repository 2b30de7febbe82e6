//! Leaderboard derived from the battle log.
//!
//! Nothing here is stored; it is recomputed from `BattleRecord`s on demand.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::battle::{Adjudication, BattleRecord};
use crate::board::{Faction, UnitId, ALL_FACTIONS, FACTION_COUNT};

/// Wins and losses for one faction or unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub wins: u32,
    pub losses: u32,
}

impl Standing {
    pub fn battles(&self) -> u32 {
        self.wins + self.losses
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    factions: [Standing; FACTION_COUNT],
    units: BTreeMap<UnitId, Standing>,
    /// Battles decided by the coin-flip fallback rather than the oracle.
    pub fallback_battles: u32,
    pub total_battles: u32,
}

impl Leaderboard {
    pub fn from_records(records: &[BattleRecord]) -> Self {
        let mut board = Leaderboard::default();
        for record in records {
            board.total_battles += 1;
            if record.adjudication == Adjudication::Fallback {
                board.fallback_battles += 1;
            }
            let winner = record.winning();
            let loser = record.losing();
            board.factions[winner.faction as usize].wins += 1;
            board.factions[loser.faction as usize].losses += 1;
            board.units.entry(winner.unit.id.clone()).or_default().wins += 1;
            board.units.entry(loser.unit.id.clone()).or_default().losses += 1;
        }
        board
    }

    pub fn faction(&self, faction: Faction) -> Standing {
        self.factions[faction as usize]
    }

    pub fn unit(&self, unit: &UnitId) -> Standing {
        self.units.get(unit).copied().unwrap_or_default()
    }

    /// Factions ordered by wins (descending), ties in canonical order.
    pub fn faction_ranking(&self) -> Vec<(Faction, Standing)> {
        let mut ranking: Vec<(Faction, Standing)> =
            ALL_FACTIONS.iter().map(|&f| (f, self.faction(f))).collect();
        ranking.sort_by(|a, b| b.1.wins.cmp(&a.1.wins));
        ranking
    }

    /// The `n` units with the most wins, ties broken by unit id.
    pub fn top_units(&self, n: usize) -> Vec<(&UnitId, Standing)> {
        let mut ranking: Vec<(&UnitId, Standing)> = self.units.iter().map(|(id, s)| (id, *s)).collect();
        ranking.sort_by(|a, b| b.1.wins.cmp(&a.1.wins).then_with(|| a.0.cmp(b.0)));
        ranking.truncate(n);
        ranking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Combatant, Side, Unit};
    use chrono::{TimeZone, Utc};

    fn battle(attacker: (&str, Faction), defender: (&str, Faction), winner: Side, adjudication: Adjudication) -> BattleRecord {
        BattleRecord {
            round_id: 1,
            cell: 0,
            attacker: Combatant { unit: Unit::bare(attacker.0, attacker.1), faction: attacker.1 },
            defender: Combatant { unit: Unit::bare(defender.0, defender.1), faction: defender.1 },
            winner,
            adjudication,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn tallies_wins_and_losses() {
        let records = vec![
            battle(("g1", Faction::Geo), ("i1", Faction::Iron), Side::Attacker, Adjudication::Oracle),
            battle(("t1", Faction::Tech), ("g1", Faction::Geo), Side::Defender, Adjudication::Fallback),
            battle(("p1", Faction::Paper), ("g1", Faction::Geo), Side::Attacker, Adjudication::Oracle),
        ];
        let board = Leaderboard::from_records(&records);
        assert_eq!(board.total_battles, 3);
        assert_eq!(board.fallback_battles, 1);
        assert_eq!(board.faction(Faction::Geo), Standing { wins: 2, losses: 1 });
        assert_eq!(board.faction(Faction::Iron), Standing { wins: 0, losses: 1 });
        assert_eq!(board.unit(&UnitId::from("g1")).battles(), 3);
        assert_eq!(board.unit(&UnitId::from("nobody")), Standing::default());
        assert_eq!(board.faction_ranking()[0].0, Faction::Geo);
        assert_eq!(board.top_units(1)[0].0, &UnitId::from("g1"));
    }

    #[test]
    fn empty_log_gives_empty_board() {
        let board = Leaderboard::from_records(&[]);
        assert_eq!(board.total_battles, 0);
        assert!(board.top_units(5).is_empty());
        // Stable sort keeps canonical order on all-zero standings.
        let order: Vec<Faction> = board.faction_ranking().into_iter().map(|(f, _)| f).collect();
        assert_eq!(order, ALL_FACTIONS.to_vec());
    }
}
