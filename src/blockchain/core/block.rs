use crate::error::{ChainError, Result};
use crate::miner::{mine_block, ProofOfWork};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

/// Memo carried by the coinbase input of the genesis block.
pub const GENESIS_COINBASE_DATA: &str = "Genesis Block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    /// Opaque payload of a transaction-less block; empty otherwise.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub prev_hash: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,
    pub difficulty: u32,
    pub nonce: u64,
}

impl Block {
    /// A candidate stamped with the current time, not yet sealed.
    pub fn unsealed(
        transactions: Vec<Transaction>,
        data: Vec<u8>,
        prev_hash: Vec<u8>,
        difficulty: u32,
    ) -> Self {
        Block {
            timestamp: chrono::Utc::now().timestamp_millis(),
            transactions,
            data,
            prev_hash,
            hash: Vec::new(),
            difficulty,
            nonce: 0,
        }
    }

    pub fn new(transactions: Vec<Transaction>, prev_hash: Vec<u8>, difficulty: u32) -> Result<Self> {
        mine_block(Block::unsealed(transactions, Vec::new(), prev_hash, difficulty))
    }

    pub fn new_data_block(data: Vec<u8>, prev_hash: Vec<u8>, difficulty: u32) -> Result<Self> {
        mine_block(Block::unsealed(Vec::new(), data, prev_hash, difficulty))
    }

    pub fn genesis(coinbase: Transaction, difficulty: u32) -> Result<Self> {
        Block::new(vec![coinbase], Vec::new(), difficulty)
    }

    /// SHA-256 over the concatenated transaction ids, in block order.
    pub fn hash_transactions(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        for tx in &self.transactions {
            hasher.update(&tx.id);
        }
        hasher.finalize().into()
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }

    pub fn prev_hash_hex(&self) -> String {
        hex::encode(&self.prev_hash)
    }

    pub fn validate_pow(&self) -> bool {
        ProofOfWork::new(self).validate()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| ChainError::DecodeFailure(e.to_string()))
    }
}
