//! Battle history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::{CellIndex, Combatant, Side};

/// How a battle's winner was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjudication {
    /// The decision oracle answered in time.
    Oracle,
    /// The oracle failed or timed out and a 50/50 coin flip was used.
    /// Lower fidelity than an oracle decision.
    Fallback,
}

impl Adjudication {
    pub fn name(self) -> &'static str {
        match self {
            Adjudication::Oracle => "oracle",
            Adjudication::Fallback => "fallback",
        }
    }
}

/// An immutable fact about one battle. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecord {
    pub round_id: u64,
    pub cell: CellIndex,
    pub attacker: Combatant,
    pub defender: Combatant,
    pub winner: Side,
    pub adjudication: Adjudication,
    pub timestamp: DateTime<Utc>,
}

impl BattleRecord {
    pub fn winning(&self) -> &Combatant {
        self.combatant(self.winner)
    }

    pub fn losing(&self) -> &Combatant {
        self.combatant(self.winner.opponent())
    }

    fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }
}
