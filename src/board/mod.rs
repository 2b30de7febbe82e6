//! Board representation and game-piece types.
//!
//! Contains the factions, units, cells and the board itself, along with the
//! per-faction territory tally used for display and settlement.

pub mod faction;
pub mod state;
pub mod tally;
pub mod unit;

pub use faction::{Faction, ALL_FACTIONS, FACTION_COUNT};
pub use state::{Board, BoardError, Cell, CellIndex, Occupant, DEFAULT_BOARD_SIZE};
pub use tally::Tally;
pub use unit::{Combatant, Side, Unit, UnitId};
