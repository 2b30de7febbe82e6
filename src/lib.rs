//! Bearfront round engine library.
//!
//! A turn-based faction territory-control contest: the board, the cooldown
//! ledger, battle resolution against an external decision oracle, and the
//! round lifecycle with settlement and rollover. Exposes the round manager,
//! stores and synchronization layer for the binaries and integration tests.

pub mod battle;
pub mod board;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod history;
pub mod manager;
pub mod protocol;
pub mod round;
pub mod session;
pub mod simulate;
pub mod store;
pub mod sync;

pub use error::GameError;
pub use manager::{ChallengeOutcome, RoundManager};
