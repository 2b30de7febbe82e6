//! Rounds: state, transitions and lifecycle.

pub mod lifecycle;
pub mod state;

pub use lifecycle::{evaluate_expiry, settle, successor, Expiry, Settlement};
pub use state::{Contest, Round, RoundStatus};
