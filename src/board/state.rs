//! Board representation.
//!
//! A board is a fixed-length sequence of cells. Each cell holds at most one
//! placed unit, and the owning faction is stored alongside the occupant so a
//! cell can never be owned while empty (or occupied while unowned).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::faction::Faction;
use super::tally::Tally;
use super::unit::{Combatant, Side, Unit, UnitId};

/// Position of a cell on the board.
pub type CellIndex = usize;

/// The default number of cells (an 8x8 grid).
pub const DEFAULT_BOARD_SIZE: usize = 64;

/// Errors produced by board-level validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("cell {0} is outside the board")]
    CellOutOfRange(CellIndex),

    #[error("cell {0} is already occupied")]
    CellOccupied(CellIndex),

    #[error("cell {cell} is already held by {faction}")]
    CellOwnedBySameFaction { cell: CellIndex, faction: Faction },

    #[error("unit '{0}' has already been used this round")]
    UnitAlreadyUsed(UnitId),

    #[error("cell {0} is empty")]
    CellEmpty(CellIndex),

    #[error("cell {cell} already belongs to {faction}")]
    SameFactionChallenge { cell: CellIndex, faction: Faction },
}

/// The unit holding a cell and the faction it holds it for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub unit: Unit,
    pub faction: Faction,
}

/// One square of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub index: CellIndex,
    pub occupant: Option<Occupant>,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    /// The faction owning this cell, if any.
    pub fn owning_faction(&self) -> Option<Faction> {
        self.occupant.as_ref().map(|o| o.faction)
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.occupant.as_ref().map(|o| &o.unit)
    }
}

/// The grid of cells for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Cell>,
}

impl Board {
    /// Creates a board of `size` empty cells.
    pub fn empty(size: usize) -> Self {
        Board {
            cells: (0..size).map(|index| Cell { index, occupant: None }).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the cell at `index`.
    pub fn cell(&self, index: CellIndex) -> Result<&Cell, BoardError> {
        self.cells.get(index).ok_or(BoardError::CellOutOfRange(index))
    }

    /// Returns the cell currently holding the given unit.
    pub fn locate(&self, unit: &UnitId) -> Option<CellIndex> {
        self.cells
            .iter()
            .find(|c| c.unit().is_some_and(|u| &u.id == unit))
            .map(|c| c.index)
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Places a unit on an empty cell for `faction`.
    ///
    /// A cell already held by `faction` reports `CellOwnedBySameFaction`;
    /// any other occupied cell reports `CellOccupied`.
    pub fn place_unit(&mut self, index: CellIndex, unit: &Unit, faction: Faction) -> Result<(), BoardError> {
        let cell = self.cell(index)?;
        if let Some(owner) = cell.owning_faction() {
            if owner == faction {
                return Err(BoardError::CellOwnedBySameFaction { cell: index, faction });
            }
            return Err(BoardError::CellOccupied(index));
        }
        if self.locate(&unit.id).is_some() {
            return Err(BoardError::UnitAlreadyUsed(unit.id.clone()));
        }
        self.cells[index].occupant = Some(Occupant { unit: unit.clone(), faction });
        Ok(())
    }

    /// Validates a challenge and returns the defender snapshot.
    ///
    /// Does not mutate the board: the outcome is applied separately once a
    /// winner has been decided.
    pub fn challenge_cell(
        &self,
        index: CellIndex,
        attacker: &Unit,
        attacker_faction: Faction,
    ) -> Result<Combatant, BoardError> {
        let cell = self.cell(index)?;
        let occupant = cell.occupant.as_ref().ok_or(BoardError::CellEmpty(index))?;
        if occupant.faction == attacker_faction {
            return Err(BoardError::SameFactionChallenge { cell: index, faction: attacker_faction });
        }
        if self.locate(&attacker.id).is_some() {
            return Err(BoardError::UnitAlreadyUsed(attacker.id.clone()));
        }
        Ok(Combatant {
            unit: occupant.unit.clone(),
            faction: occupant.faction,
        })
    }

    /// Applies a decided battle to a cell.
    ///
    /// When the attacker wins it takes the cell for its faction and the
    /// evicted occupant is returned. A defender win leaves the board as is.
    pub fn apply_battle_outcome(
        &mut self,
        index: CellIndex,
        attacker: &Unit,
        attacker_faction: Faction,
        winner: Side,
    ) -> Result<Option<Occupant>, BoardError> {
        self.cell(index)?;
        match winner {
            Side::Defender => Ok(None),
            Side::Attacker => {
                let evicted = self.cells[index].occupant.replace(Occupant {
                    unit: attacker.clone(),
                    faction: attacker_faction,
                });
                Ok(evicted)
            }
        }
    }

    /// Counts owned cells per faction.
    pub fn count_by_faction(&self) -> Tally {
        let mut tally = Tally::default();
        for faction in self.cells.iter().filter_map(Cell::owning_faction) {
            tally.add(faction);
        }
        tally
    }

    /// Returns true if cell indices match their positions and no unit
    /// occupies more than one cell.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        for (pos, cell) in self.cells.iter().enumerate() {
            if cell.index != pos {
                return false;
            }
            if let Some(unit) = cell.unit() {
                if !seen.insert(&unit.id) {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::empty(DEFAULT_BOARD_SIZE)
    }
}
