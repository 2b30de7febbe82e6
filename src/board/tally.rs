//! Territory tally per faction.

use serde::{Deserialize, Serialize};

use super::faction::{Faction, ALL_FACTIONS, FACTION_COUNT};

/// Owned-cell counts indexed by `Faction as usize`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    counts: [usize; FACTION_COUNT],
}

impl Tally {
    pub fn get(&self, faction: Faction) -> usize {
        self.counts[faction as usize]
    }

    pub fn add(&mut self, faction: Faction) {
        self.counts[faction as usize] += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Iterates `(faction, count)` pairs in canonical faction order.
    pub fn iter(&self) -> impl Iterator<Item = (Faction, usize)> + '_ {
        ALL_FACTIONS.iter().map(move |&f| (f, self.get(f)))
    }

    /// The faction with the strict maximum count.
    ///
    /// Ties go to the faction that comes first in canonical order. An empty
    /// tally has no leader.
    pub fn leader(&self) -> Option<Faction> {
        let mut best: Option<(Faction, usize)> = None;
        for (faction, count) in self.iter() {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, top)) if count <= top => {}
                _ => best = Some((faction, count)),
            }
        }
        best.map(|(f, _)| f)
    }
}
