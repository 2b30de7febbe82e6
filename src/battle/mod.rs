//! Battle resolution.
//!
//! A battle is decided exactly once by an injected decision oracle, bounded
//! by a timeout, with an unweighted coin flip as the fallback. Concluding a
//! battle puts the loser on cooldown and yields the historical record.

pub mod oracle;
pub mod record;
pub mod resolver;

pub use oracle::{DecisionOracle, FixedOracle, OfflineOracle, OracleError, RandomOracle};
pub use record::{Adjudication, BattleRecord};
pub use resolver::{BattleResolver, Verdict};
