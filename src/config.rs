//! Game configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) yields the reference rules: a 64-cell board, 24 hour
//! rounds and 2 hour cooldowns.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::DEFAULT_BOARD_SIZE;

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config value '{0}' must be greater than zero")]
    Zero(&'static str),

    #[error("contest_lease_secs must outlast oracle_timeout_ms")]
    LeaseShorterThanOracleTimeout,
}

/// Tunable rules and operational limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of cells on the board.
    pub board_size: usize,
    /// Length of a round from start to expiry.
    pub round_duration_secs: u64,
    /// Cooldown applied to the loser of a battle.
    pub cooldown_secs: u64,
    /// Upper bound on a single decision-oracle call.
    pub oracle_timeout_ms: u64,
    /// Attempts at committing a transition before giving up on store conflicts.
    pub commit_retries: u32,
    /// Age after which a pending contest is treated as abandoned.
    pub contest_lease_secs: u64,
    /// Seed for the fallback coin flip (0 = entropy).
    pub rng_seed: u64,
    /// Period of the background expiry check.
    pub expiry_check_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            board_size: DEFAULT_BOARD_SIZE,
            round_duration_secs: 24 * 60 * 60,
            cooldown_secs: 2 * 60 * 60,
            oracle_timeout_ms: 3_000,
            commit_retries: 3,
            contest_lease_secs: 60,
            rng_seed: 0,
            expiry_check_secs: 30,
        }
    }
}

impl GameConfig {
    /// Parses a config from TOML text and validates it.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, u64); 6] = [
            ("board_size", self.board_size as u64),
            ("round_duration_secs", self.round_duration_secs),
            ("cooldown_secs", self.cooldown_secs),
            ("oracle_timeout_ms", self.oracle_timeout_ms),
            ("commit_retries", u64::from(self.commit_retries)),
            ("contest_lease_secs", self.contest_lease_secs),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero(name));
        }
        if self.contest_lease_secs.saturating_mul(1_000) <= self.oracle_timeout_ms {
            return Err(ConfigError::LeaseShorterThanOracleTimeout);
        }
        Ok(())
    }

    pub fn round_duration(&self) -> chrono::Duration {
        secs(self.round_duration_secs)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        secs(self.cooldown_secs)
    }

    pub fn contest_lease(&self) -> chrono::Duration {
        secs(self.contest_lease_secs)
    }

    pub fn oracle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn expiry_check_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expiry_check_secs.max(1))
    }
}

fn secs(s: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(s).unwrap_or(i64::MAX / 1_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_reference_rules() {
        let config = GameConfig::from_toml("").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.board_size, 64);
        assert_eq!(config.round_duration(), chrono::Duration::hours(24));
        assert_eq!(config.cooldown(), chrono::Duration::hours(2));
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = GameConfig::from_toml("board_size = 16\ncooldown_secs = 60\n").unwrap();
        assert_eq!(config.board_size, 16);
        assert_eq!(config.cooldown(), chrono::Duration::minutes(1));
        assert_eq!(config.round_duration_secs, 86_400);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = GameConfig::from_toml("board_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Zero("board_size")));
        let err = GameConfig::from_toml("commit_retries = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Zero("commit_retries")));
    }

    #[test]
    fn lease_must_outlast_oracle_timeout() {
        let err = GameConfig::from_toml("contest_lease_secs = 2\noracle_timeout_ms = 5000").unwrap_err();
        assert!(matches!(err, ConfigError::LeaseShorterThanOracleTimeout));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            GameConfig::from_toml("board_size = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
