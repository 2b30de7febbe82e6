//! Unit catalog.
//!
//! Read-only lookup of unit metadata and account ownership. The core never
//! writes to it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::{Faction, Unit, UnitId, ALL_FACTIONS};

/// Errors loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate unit id '{0}' in catalog")]
    DuplicateUnit(UnitId),
}

/// Lookup of unit metadata and ownership.
pub trait UnitCatalog: Send + Sync {
    fn unit(&self, id: &UnitId) -> Option<Unit>;
    fn owned_units(&self, account: &str) -> BTreeSet<UnitId>;
}

/// One catalog entry as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub unit: Unit,
    pub owner: String,
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    units: BTreeMap<UnitId, Unit>,
    owners: BTreeMap<String, BTreeSet<UnitId>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit owned by `owner`. Fails on a duplicate id.
    pub fn insert(&mut self, unit: Unit, owner: impl Into<String>) -> Result<(), CatalogError> {
        if self.units.contains_key(&unit.id) {
            return Err(CatalogError::DuplicateUnit(unit.id));
        }
        self.owners.entry(owner.into()).or_default().insert(unit.id.clone());
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Builds a catalog from a JSON array of entries.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(text)?;
        let mut catalog = MemoryCatalog::new();
        for entry in entries {
            catalog.insert(entry.unit, entry.owner)?;
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// A small catalog: one account per faction (`<faction>-player`), each
    /// owning four units named `<faction>-1` .. `<faction>-4`.
    pub fn demo() -> Self {
        let mut catalog = MemoryCatalog::new();
        for faction in ALL_FACTIONS {
            for n in 1..=4 {
                let id = format!("{}-{n}", faction.name());
                let unit = Unit {
                    display_name: format!("{} Bear #{n}", title(faction)),
                    image_ref: format!("bears/{id}.png"),
                    id: UnitId(id),
                    faction,
                };
                // Ids are unique by construction.
                let _ = catalog.insert(unit, format!("{}-player", faction.name()));
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }
}

fn title(faction: Faction) -> String {
    let name = faction.name();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

impl UnitCatalog for MemoryCatalog {
    fn unit(&self, id: &UnitId) -> Option<Unit> {
        self.units.get(id).cloned()
    }

    fn owned_units(&self, account: &str) -> BTreeSet<UnitId> {
        self.owners.get(account).cloned().unwrap_or_default()
    }
}
