//! Line protocol command parser.
//!
//! Parses incoming text lines into structured `Command` variants that the
//! session loop can dispatch on.

use crate::board::{CellIndex, UnitId};

/// Errors for lines that name a known command but carry bad arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("malformed {command}: expected '{usage}'")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },

    #[error("invalid cell index: '{0}'")]
    InvalidCell(String),
}

impl ParseError {
    /// Stable name reported in `error <kind> <message>` responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::UnknownCommand(_) => "unknown_command",
            ParseError::Usage { .. } => "usage",
            ParseError::InvalidCell(_) => "invalid_cell",
        }
    }
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Synchronization ping; replies `readyok`.
    IsReady,

    /// Switch the acting account: `account <id>`.
    Account { id: String },

    /// List the acting account's selectable units.
    Units,

    /// `place <cell> <unit>`
    Place { cell: CellIndex, unit: UnitId },

    /// `challenge <cell> <unit>`
    Challenge { cell: CellIndex, unit: UnitId },

    /// Print the board grid.
    Board,

    /// Print owned-cell counts per faction.
    Tally,

    /// Print the round id, revision and timing.
    Round,

    /// Evaluate round expiry now.
    Expire,

    /// Print the battle log.
    History,

    /// Print the derived leaderboard.
    Leaderboard,

    /// End the session.
    Quit,
}

/// Parses a single line of input.
///
/// Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let command = match tokens[0] {
        "isready" => Command::IsReady,
        "units" => Command::Units,
        "board" => Command::Board,
        "tally" => Command::Tally,
        "round" => Command::Round,
        "expire" => Command::Expire,
        "history" => Command::History,
        "leaderboard" => Command::Leaderboard,
        "quit" => Command::Quit,
        "account" => match tokens.as_slice() {
            [_, id] => Command::Account { id: id.to_string() },
            _ => {
                return Err(ParseError::Usage {
                    command: "account",
                    usage: "account <id>",
                })
            }
        },
        "place" => {
            let (cell, unit) = parse_cell_and_unit(&tokens, "place", "place <cell> <unit>")?;
            Command::Place { cell, unit }
        }
        "challenge" => {
            let (cell, unit) = parse_cell_and_unit(&tokens, "challenge", "challenge <cell> <unit>")?;
            Command::Challenge { cell, unit }
        }
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_cell_and_unit(
    tokens: &[&str],
    command: &'static str,
    usage: &'static str,
) -> Result<(CellIndex, UnitId), ParseError> {
    let [_, cell, unit] = tokens else {
        return Err(ParseError::Usage { command, usage });
    };
    let cell = cell
        .parse::<CellIndex>()
        .map_err(|_| ParseError::InvalidCell(cell.to_string()))?;
    Ok((cell, UnitId::from(*unit)))
}
