//! Caller-facing errors.
//!
//! Every validation failure carries its specific kind so the presentation
//! layer can report the exact reason. A failed operation never leaves a
//! unit marked used, on cooldown, or the board mutated.

use crate::board::{BoardError, CellIndex, UnitId};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("unit '{unit}' is on cooldown for another {remaining_secs}s")]
    UnitOnCooldown { unit: UnitId, remaining_secs: i64 },

    #[error("cell {0} has a battle in progress")]
    CellContested(CellIndex),

    #[error("unit '{0}' is already in a battle")]
    UnitBusy(UnitId),

    #[error("round {0} is not active")]
    RoundNotActive(u64),

    #[error("unknown unit '{0}'")]
    UnknownUnit(UnitId),

    #[error("battle task was interrupted before completion")]
    BattleInterrupted,

    #[error("commit lost to concurrent updates {0} times")]
    StoreConflict(u32),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl GameError {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::Board(e) => match e {
                BoardError::CellOutOfRange(_) => "cell_out_of_range",
                BoardError::CellOccupied(_) => "cell_occupied",
                BoardError::CellOwnedBySameFaction { .. } => "cell_owned_by_same_faction",
                BoardError::UnitAlreadyUsed(_) => "unit_already_used",
                BoardError::CellEmpty(_) => "cell_empty",
                BoardError::SameFactionChallenge { .. } => "same_faction_challenge",
            },
            GameError::UnitOnCooldown { .. } => "unit_on_cooldown",
            GameError::CellContested(_) => "cell_contested",
            GameError::UnitBusy(_) => "unit_busy",
            GameError::RoundNotActive(_) => "round_not_active",
            GameError::UnknownUnit(_) => "unknown_unit",
            GameError::BattleInterrupted => "battle_interrupted",
            GameError::StoreConflict(_) => "store_conflict",
            GameError::Store(_) => "store_failure",
        }
    }
}
