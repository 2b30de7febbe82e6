//! Text protocol.
//!
//! The line command parser used by the session loop and the grid notation
//! used to print (and in tests, set up) boards.

pub mod notation;
pub mod parser;

pub use notation::{format_board, grid_width, parse_board, NotationError};
pub use parser::{parse_command, Command, ParseError};
