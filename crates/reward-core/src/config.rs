use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("daily cap {cap} is below the largest single credit {largest}")]
    CapBelowSingleCredit { cap: u64, largest: u64 },
}

/// Static token amounts and the per-day ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicyConfig {
    pub tokens_per_minute: u64,
    pub song_completion_bonus: u64,
    pub daily_cap: u64,
}

impl Default for RewardPolicyConfig {
    fn default() -> Self {
        Self {
            tokens_per_minute: 1,
            song_completion_bonus: 5,
            daily_cap: 100,
        }
    }
}

impl RewardPolicyConfig {
    pub fn largest_single_credit(&self) -> u64 {
        self.tokens_per_minute.max(self.song_completion_bonus)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let largest = self.largest_single_credit();
        if self.daily_cap < largest {
            return Err(ConfigError::CapBelowSingleCredit {
                cap: self.daily_cap,
                largest,
            });
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Runtime knobs for the ledger and its persistence layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerOptions {
    pub history_limit: usize,
    pub state_key: String,
    pub persist_session_snapshots: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            history_limit: 50,
            state_key: "listening_rewards.ledger".into(),
            persist_session_snapshots: true,
        }
    }
}
