//! Faction definitions.
//!
//! The four factions are enumerated in canonical order, which is also the
//! lexicographic order of their names. Settlement tie-breaks rely on this.

use serde::{Deserialize, Serialize};

/// The number of factions in play.
pub const FACTION_COUNT: usize = 4;

/// A faction a unit is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Faction {
    Geo = 0,
    Iron = 1,
    Paper = 2,
    Tech = 3,
}

/// All factions in canonical order.
pub const ALL_FACTIONS: [Faction; FACTION_COUNT] =
    [Faction::Geo, Faction::Iron, Faction::Paper, Faction::Tech];

impl Faction {
    /// All factions in canonical order.
    pub const ALL: [Faction; FACTION_COUNT] = ALL_FACTIONS;

    /// Returns the lowercase name of this faction.
    pub const fn name(self) -> &'static str {
        match self {
            Faction::Geo => "geo",
            Faction::Iron => "iron",
            Faction::Paper => "paper",
            Faction::Tech => "tech",
        }
    }

    /// Returns the single-character abbreviation used in board notation.
    pub const fn notation_char(self) -> char {
        match self {
            Faction::Geo => 'G',
            Faction::Iron => 'I',
            Faction::Paper => 'P',
            Faction::Tech => 'T',
        }
    }

    /// Parses a faction from its lowercase name.
    pub fn from_name(name: &str) -> Option<Faction> {
        match name {
            "geo" => Some(Faction::Geo),
            "iron" => Some(Faction::Iron),
            "paper" => Some(Faction::Paper),
            "tech" => Some(Faction::Tech),
            _ => None,
        }
    }

    /// Parses a faction from its notation character.
    pub fn from_notation_char(c: char) -> Option<Faction> {
        ALL_FACTIONS.into_iter().find(|f| f.notation_char() == c)
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
