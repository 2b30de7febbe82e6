//! Decision oracles.
//!
//! The oracle is the external authority on who wins a single battle. It may
//! be slow or unreachable; the resolver bounds and backs it up.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::{Side, UnitId};

/// Why the oracle produced no decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("decision oracle unavailable: {0}")]
    Unavailable(String),

    #[error("decision oracle timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// Adjudicates a single battle between two units.
pub trait DecisionOracle: Send + Sync {
    fn decide(
        &self,
        attacker: &UnitId,
        defender: &UnitId,
    ) -> impl Future<Output = Result<Side, OracleError>> + Send;
}

impl<O: DecisionOracle> DecisionOracle for Arc<O> {
    async fn decide(&self, attacker: &UnitId, defender: &UnitId) -> Result<Side, OracleError> {
        (**self).decide(attacker, defender).await
    }
}

/// An oracle that is never reachable; every battle falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

impl DecisionOracle for OfflineOracle {
    async fn decide(&self, _attacker: &UnitId, _defender: &UnitId) -> Result<Side, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".to_string()))
    }
}

/// An oracle that always names the same side.
#[derive(Debug, Clone, Copy)]
pub struct FixedOracle(pub Side);

impl DecisionOracle for FixedOracle {
    async fn decide(&self, _attacker: &UnitId, _defender: &UnitId) -> Result<Side, OracleError> {
        Ok(self.0)
    }
}

/// A local pseudo-random oracle that fails a configurable share of calls.
#[derive(Debug)]
pub struct RandomOracle {
    rng: Mutex<SmallRng>,
    failure_rate: f64,
}

impl RandomOracle {
    /// `seed` 0 draws from entropy. `failure_rate` is clamped to [0, 1].
    pub fn new(seed: u64, failure_rate: f64) -> Self {
        let rng = if seed != 0 {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_entropy()
        };
        RandomOracle {
            rng: Mutex::new(rng),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

impl DecisionOracle for RandomOracle {
    async fn decide(&self, _attacker: &UnitId, _defender: &UnitId) -> Result<Side, OracleError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if rng.gen_bool(self.failure_rate) {
            return Err(OracleError::Unavailable("simulated outage".to_string()));
        }
        Ok(if rng.gen_bool(0.5) { Side::Attacker } else { Side::Defender })
    }
}
