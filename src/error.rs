//! Error types for SealChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Wrong wallet: cannot sign transactions for other wallets")]
    WrongWallet,
    #[error("Missing signature: no signature in this transaction")]
    MissingSignature,
    #[error("Malformed key: {0}")]
    MalformedKey(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Missing address: transaction must include from and to address")]
    MissingAddress,
    #[error("Invalid signature: cannot add invalid transaction to the chain")]
    InvalidSignature,
    #[error("Non-positive amount: transaction amount should be higher than 0")]
    NonPositiveAmount,
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Invalid block linkage at height {0}")]
    InvalidBlockLinkage(usize),
    #[error("Mining cancelled")]
    MiningCancelled,
    #[error("Mining gave up after {0} iterations")]
    MiningExhausted(u64),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
