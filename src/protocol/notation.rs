//! Board grid notation.
//!
//! One text row per board row, cells separated by single spaces. An empty
//! cell is `.`; an occupied cell is `<faction char>:<unit id>`, e.g.
//! `I:iron-1`. Boards whose size is a perfect square print as a square grid,
//! anything else as a single row.

use crate::board::{Board, Faction, Unit};

/// Errors parsing grid notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("invalid cell token: '{0}'")]
    InvalidToken(String),

    #[error("invalid faction character: '{0}'")]
    InvalidFaction(char),

    #[error("unit '{0}' appears more than once")]
    DuplicateUnit(String),
}

/// Row width used when printing a board of `len` cells.
pub fn grid_width(len: usize) -> usize {
    let root = (len as f64).sqrt().round() as usize;
    if root > 0 && root * root == len {
        root
    } else {
        len.max(1)
    }
}

/// Formats a board as grid notation.
pub fn format_board(board: &Board) -> String {
    let width = grid_width(board.len());
    board
        .cells()
        .chunks(width)
        .map(|row| {
            row.iter()
                .map(|cell| match &cell.occupant {
                    Some(o) => format!("{}:{}", o.faction.notation_char(), o.unit.id),
                    None => ".".to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses grid notation into a board. Units are created bare (display name
/// equal to id, no image) with the faction given in the token.
pub fn parse_board(text: &str) -> Result<Board, NotationError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut board = Board::empty(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        if *token == "." {
            continue;
        }
        let (faction_part, id) = token
            .split_once(':')
            .filter(|(f, id)| f.chars().count() == 1 && !id.is_empty())
            .ok_or_else(|| NotationError::InvalidToken(token.to_string()))?;
        let c = faction_part.chars().next().unwrap_or(' ');
        let faction = Faction::from_notation_char(c).ok_or(NotationError::InvalidFaction(c))?;
        board
            .place_unit(index, &Unit::bare(id, faction), faction)
            .map_err(|_| NotationError::DuplicateUnit(id.to_string()))?;
    }
    Ok(board)
}
