//! Error types for blockledger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Blockchain already exists at {0}")]
    LedgerAlreadyExists(String),
    #[error("No existing blockchain found at {0}, create one first")]
    NoLedgerFound(String),
    #[error("Storage error: {0}")]
    StorageIo(String),
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("Failed to decode block: {0}")]
    DecodeFailure(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Block already exists: {0}")]
    BlockAlreadyExists(String),
    #[error("Invalid proof of work for block {0}")]
    InvalidProofOfWork(String),
    #[error("Invalid block linkage: {0}")]
    InvalidBlockLinkage(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Proof of work exhausted the nonce space")]
    NonceSpaceExhausted,
    #[error("Mining cancelled")]
    MiningCancelled,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl ChainError {
    /// Failures a caller can react to without assuming the ledger is damaged.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChainError::InsufficientFunds { .. }
                | ChainError::InvalidAmount(_)
                | ChainError::InvalidTransaction(_)
                | ChainError::MiningCancelled
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::StorageIo(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
