//! Unit identity and metadata.
//!
//! A unit is a placeable token aligned to one faction. Ownership by an
//! account lives in the catalog; the board only ever sees snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::faction::Faction;

/// Stable external identifier of a unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        UnitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        UnitId(s.to_string())
    }
}

/// A placeable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub display_name: String,
    pub image_ref: String,
    pub faction: Faction,
}

impl Unit {
    /// Builds a unit whose display name is its id and with no image.
    pub fn bare(id: impl Into<String>, faction: Faction) -> Self {
        let id = id.into();
        Unit {
            display_name: id.clone(),
            id: UnitId(id),
            image_ref: String::new(),
            faction,
        }
    }
}

/// A unit snapshot taken at battle time, paired with the faction it fought for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub unit: Unit,
    pub faction: Faction,
}

/// Which side of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    /// The other side.
    pub const fn opponent(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Side::Attacker => "attacker",
            Side::Defender => "defender",
        }
    }
}
