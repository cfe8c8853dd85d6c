//! Configuration management for SealChain

use crate::error::ChainError;
use crate::miner::MiningControl;
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// SHA-256 renders as 64 hex digits; asking for more zeros can never succeed.
pub const MAX_DIFFICULTY: u32 = 64;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Leading zero hex digits required of a mined block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Payout credited to the miner of each block
    #[serde(default = "default_mining_reward")]
    pub mining_reward: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MinerConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Give up on a block after this many nonces; unbounded when absent
    #[serde(default)]
    pub max_iterations: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            max_iterations: None,
        }
    }
}

impl MinerConfig {
    pub fn control(&self) -> MiningControl {
        match self.max_iterations {
            Some(max) => MiningControl::new().with_max_iterations(max),
            None => MiningControl::new(),
        }
    }
}

fn default_difficulty() -> u32 {
    2
}

fn default_mining_reward() -> u32 {
    100
}

fn default_threads() -> usize {
    1
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.chain.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::Config(format!(
                "chain.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.chain.difficulty
            )));
        }
        if self.chain.mining_reward == 0 {
            return Err(ChainError::Config("chain.mining_reward must be greater than zero".to_string()));
        }
        if Amount::checked_from_num(self.chain.mining_reward).is_none() {
            return Err(ChainError::Config(format!(
                "chain.mining_reward must be at most {}, got {}",
                Amount::MAX.to_num::<u32>(),
                self.chain.mining_reward
            )));
        }
        if self.miner.threads == 0 {
            return Err(ChainError::Config("miner.threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Reads `path` as TOML. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config: Config = match fs::read_to_string(path.as_ref()) {
        Ok(config_str) => toml::from_str(&config_str)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.chain.mining_reward, 100);
        assert_eq!(config.miner.threads, 1);
        assert_eq!(config.miner.max_iterations, None);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\ndifficulty = 3\n\n[miner]\nmax_iterations = 5000").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.chain.difficulty, 3);
        assert_eq!(config.chain.mining_reward, 100);
        assert_eq!(config.miner.threads, 1);
        assert_eq!(config.miner.control().max_iterations(), Some(5000));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\ndifficulty = 65").unwrap();
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[miner]\nthreads = 0").unwrap();
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\nmining_reward = 0").unwrap();
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_reward_beyond_amount_range_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\nmining_reward = 3000000000").unwrap();
        let result = load_config(file.path());
        assert!(matches!(result, Err(ChainError::Config(msg)) if msg.contains("at most 2147483647")));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\nmining_reward = 2147483647").unwrap();
        assert_eq!(load_config(file.path()).unwrap().chain.mining_reward, 2_147_483_647);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chain\ndifficulty = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ChainError::Config(_))));
    }
}
