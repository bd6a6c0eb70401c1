use super::block::{Block, GENESIS_COINBASE_DATA};
use super::iterator::{ChainIterator, ChainSnapshot};
use crate::error::{ChainError, Result};
use crate::miner::mine_block;
use crate::persistence::{Database, Persistence};
use crate::transaction::{SpendableOutputSource, SpendableOutputs, Transaction, TxOutput};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use tracing::info;

/// Default location of the ledger file.
pub const DEFAULT_DB_PATH: &str = "./blockchain.db";

/// Proof-of-work difficulty, in leading zero bits, for new blocks.
pub const DEFAULT_DIFFICULTY: u32 = 10;

/// The ledger service.
///
/// Appends hold the tip lock from reading the tip until the new tip is
/// recorded, so two appends can never build on the same predecessor. Reads
/// take a snapshot of the tip and walk the chain without the lock.
pub struct Blockchain {
    tip: Mutex<Vec<u8>>,
    difficulty: u32,
    persistence: Box<dyn Persistence>,
}

impl Blockchain {
    /// Creates a new ledger file at `path` with a genesis block rewarding `address`.
    pub fn create(path: impl AsRef<Path>, address: &str, difficulty: u32) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ChainError::LedgerAlreadyExists(path.display().to_string()));
        }

        let db = Database::open(path)?;
        Self::create_with_persistence(Box::new(db), address, difficulty).inspect_err(|_| {
            // Remove the partially written ledger file.
            let _ = fs::remove_file(path);
        })
    }

    pub fn create_with_persistence(
        persistence: Box<dyn Persistence>,
        address: &str,
        difficulty: u32,
    ) -> Result<Self> {
        if let Some(tip) = persistence.discover_tip()? {
            return Err(ChainError::LedgerAlreadyExists(format!(
                "store already has tip {}",
                hex::encode(tip)
            )));
        }

        let coinbase = Transaction::new_coinbase(address, GENESIS_COINBASE_DATA)?;
        let genesis = Block::genesis(coinbase, difficulty)?;
        persistence.save_block_and_tip(&genesis.hash, &genesis.serialize()?, genesis.timestamp)?;
        info!("Genesis block created with hash {}", genesis.hash_hex());

        Ok(Blockchain {
            tip: Mutex::new(genesis.hash),
            difficulty,
            persistence,
        })
    }

    /// Opens an existing ledger. Never creates a genesis block.
    pub fn open(path: impl AsRef<Path>, difficulty: u32) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChainError::NoLedgerFound(path.display().to_string()));
        }

        let db = Database::open(path)?;
        Self::open_with_persistence(Box::new(db), difficulty).map_err(|e| match e {
            ChainError::NoLedgerFound(_) => ChainError::NoLedgerFound(path.display().to_string()),
            e => e,
        })
    }

    pub fn open_with_persistence(persistence: Box<dyn Persistence>, difficulty: u32) -> Result<Self> {
        let tip = persistence
            .discover_tip()?
            .ok_or_else(|| ChainError::NoLedgerFound("store holds no blocks".to_string()))?;

        Ok(Blockchain {
            tip: Mutex::new(tip),
            difficulty,
            persistence,
        })
    }

    pub fn tip(&self) -> Vec<u8> {
        self.tip.lock().clone()
    }

    pub fn block_count(&self) -> Result<u64> {
        self.persistence.block_count()
    }

    pub fn snapshot(&self) -> ChainSnapshot<'_> {
        ChainSnapshot::new(self.persistence.as_ref(), self.tip())
    }

    /// A fresh walk from the current tip back to genesis.
    pub fn iter(&self) -> ChainIterator<'_> {
        self.snapshot().iter()
    }

    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        self.snapshot().find_unspent_transactions(address)
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        self.snapshot().find_utxo(address)
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        self.snapshot().get_balance(address)
    }

    /// Transfers `amount` from `from` to `to` in a newly mined block.
    pub fn send(&self, from: &str, to: &str, amount: u64) -> Result<Block> {
        let mut tip = self.tip.lock();
        let snapshot = ChainSnapshot::new(self.persistence.as_ref(), tip.clone());
        let tx = Transaction::new_utxo_transaction(from, to, amount, &snapshot)?;
        self.append_locked(&mut tip, vec![tx], Vec::new())
    }

    /// Mines `transactions` into a new block. Every non-coinbase transaction
    /// must spend existing unspent outputs it can unlock, and may not pay out
    /// more than it spends.
    pub fn mine_block(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let mut tip = self.tip.lock();
        self.append_locked(&mut tip, transactions, Vec::new())
    }

    /// Appends a transaction-less block carrying `data`.
    pub fn add_block(&self, data: impl Into<Vec<u8>>) -> Result<Block> {
        let mut tip = self.tip.lock();
        self.append_locked(&mut tip, Vec::new(), data.into())
    }

    fn append_locked(
        &self,
        tip: &mut Vec<u8>,
        transactions: Vec<Transaction>,
        data: Vec<u8>,
    ) -> Result<Block> {
        ChainSnapshot::new(self.persistence.as_ref(), tip.clone()).validate_transactions(&transactions)?;

        let mut candidate = Block::unsealed(transactions, data, tip.clone(), self.difficulty);

        // Keep timestamps increasing so the newest-timestamp query agrees with the tip.
        if let Some(serialized) = self.persistence.get_block(tip.as_slice())? {
            let previous = Block::deserialize(&serialized)?;
            if candidate.timestamp <= previous.timestamp {
                candidate.timestamp = previous.timestamp + 1;
            }
        }

        let block = mine_block(candidate)?;
        self.persistence
            .save_block_and_tip(&block.hash, &block.serialize()?, block.timestamp)?;
        *tip = block.hash.clone();

        info!(
            "Added block with hash {} ({} transactions, nonce {})",
            block.hash_hex(),
            block.transactions.len(),
            block.nonce
        );
        Ok(block)
    }

    /// Checks proof of work and hash linkage of every block reachable from the
    /// tip. Returns the number of blocks checked.
    pub fn verify(&self) -> Result<usize> {
        let mut expected_hash: Option<Vec<u8>> = None;
        let mut reached_genesis = false;
        let mut count = 0;

        for block in self.iter() {
            let block = block?;
            if !block.validate_pow() {
                return Err(ChainError::InvalidProofOfWork(block.hash_hex()));
            }
            if let Some(expected) = &expected_hash {
                if block.hash != *expected {
                    return Err(ChainError::InvalidBlockLinkage(format!(
                        "expected block {} but found {}",
                        hex::encode(expected),
                        block.hash_hex()
                    )));
                }
            }
            reached_genesis = block.is_genesis();
            expected_hash = Some(block.prev_hash);
            count += 1;
        }

        if !reached_genesis {
            return Err(ChainError::InvalidBlockLinkage(format!(
                "chain does not end at a genesis block (missing {})",
                expected_hash.map(hex::encode).unwrap_or_default()
            )));
        }
        Ok(count)
    }
}

impl SpendableOutputSource for Blockchain {
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs> {
        self.snapshot().find_spendable_outputs(address, amount)
    }
}
