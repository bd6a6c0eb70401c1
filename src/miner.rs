//! Proof-of-work sealing.
//!
//! The seal of a block is
//! `SHA-256(prev_hash ‖ hash_transactions ‖ data ‖ BE64(timestamp) ‖ BE64(difficulty) ‖ BE64(nonce))`
//! and is accepted when, read as a big-endian 256-bit integer, it is below
//! `2^(256 - difficulty)`. The search is a plain linear scan from nonce 0.

use crate::blockchain::{Block, Sha256Hash};
use crate::error::{ChainError, Result};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::debug;

/// How many nonces are tried between polls of a cancellation flag.
const CANCEL_POLL_INTERVAL: u64 = 4096;

/// `2^(256 - difficulty)` as big-endian bytes. `None` for difficulty 0,
/// whose target (`2^256`) does not fit and accepts every hash.
pub fn hash_to_target(difficulty: u32) -> Option<Sha256Hash> {
    if difficulty == 0 {
        return None;
    }
    let exponent = 256 - difficulty.min(256);
    let mut target = [0u8; 32];
    target[31 - (exponent / 8) as usize] = 1 << (exponent % 8);
    Some(target)
}

/// Big-endian comparison of a hash against the target for `difficulty`.
pub fn meets_target(hash: &[u8], difficulty: u32) -> bool {
    match hash_to_target(difficulty) {
        None => true,
        Some(target) => hash.len() == target.len() && hash < &target[..],
    }
}

pub struct ProofOfWork<'a> {
    block: &'a Block,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block) -> Self {
        Self { block }
    }

    pub fn difficulty(&self) -> u32 {
        self.block.difficulty
    }

    pub fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let block = self.block;
        let mut data = Vec::with_capacity(block.prev_hash.len() + 32 + block.data.len() + 24);
        data.extend_from_slice(&block.prev_hash);
        data.extend_from_slice(&block.hash_transactions());
        data.extend_from_slice(&block.data);
        data.extend_from_slice(&block.timestamp.to_be_bytes());
        data.extend_from_slice(&i64::from(block.difficulty).to_be_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data
    }

    pub fn seal_hash(&self, nonce: u64) -> Sha256Hash {
        Sha256::digest(self.prepare_data(nonce)).into()
    }

    /// Finds the smallest nonce whose seal meets the target.
    pub fn run(&self) -> Result<(u64, Sha256Hash)> {
        self.search(None)
    }

    /// Same search as [`ProofOfWork::run`], abandoned once `cancel` is set.
    pub fn run_cancellable(&self, cancel: &AtomicBool) -> Result<(u64, Sha256Hash)> {
        self.search(Some(cancel))
    }

    /// Recomputes the seal from the stored nonce. True only when the seal is
    /// below the target and also equals the block's stored `hash`.
    pub fn validate(&self) -> bool {
        let hash = self.seal_hash(self.block.nonce);
        meets_target(&hash, self.block.difficulty) && hash[..] == self.block.hash[..]
    }

    fn search(&self, cancel: Option<&AtomicBool>) -> Result<(u64, Sha256Hash)> {
        // The prefix up to the nonce is fixed for the whole search.
        let mut prefix = self.prepare_data(0);
        prefix.truncate(prefix.len() - 8);

        let started = Instant::now();
        for nonce in 0..u64::MAX {
            if nonce % CANCEL_POLL_INTERVAL == 0 {
                if let Some(flag) = cancel {
                    if flag.load(Ordering::Relaxed) {
                        return Err(ChainError::MiningCancelled);
                    }
                }
            }

            let mut hasher = Sha256::new();
            hasher.update(&prefix);
            hasher.update(nonce.to_be_bytes());
            let hash: Sha256Hash = hasher.finalize().into();

            if meets_target(&hash, self.block.difficulty) {
                debug!(
                    "Found nonce {} at difficulty {} in {:?}",
                    nonce,
                    self.block.difficulty,
                    started.elapsed()
                );
                return Ok((nonce, hash));
            }
        }
        Err(ChainError::NonceSpaceExhausted)
    }
}

/// Seals `block`, assigning its nonce and hash.
pub fn mine_block(mut block: Block) -> Result<Block> {
    let (nonce, hash) = ProofOfWork::new(&block).run()?;
    block.nonce = nonce;
    block.hash = hash.to_vec();
    Ok(block)
}

pub fn mine_block_cancellable(mut block: Block, cancel: &AtomicBool) -> Result<Block> {
    let (nonce, hash) = ProofOfWork::new(&block).run_cancellable(cancel)?;
    block.nonce = nonce;
    block.hash = hash.to_vec();
    Ok(block)
}

/// Proof-of-work running on a worker thread.
pub struct MiningJob {
    cancel: Arc<AtomicBool>,
    result: Receiver<Result<Block>>,
    handle: Option<JoinHandle<()>>,
}

impl MiningJob {
    pub fn spawn(block: Block) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, result) = bounded(1);
        let flag = Arc::clone(&cancel);
        let handle = thread::spawn(move || {
            let _ = sender.send(mine_block_cancellable(block, &flag));
        });
        Self {
            cancel,
            result,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Non-blocking poll; `None` while the search is still running.
    pub fn try_result(&self) -> Option<Result<Block>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ChainError::MiningCancelled)),
        }
    }

    /// Blocks until the worker finishes.
    pub fn wait(mut self) -> Result<Block> {
        let result = self
            .result
            .recv()
            .unwrap_or(Err(ChainError::MiningCancelled));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        result
    }
}

impl Drop for MiningJob {
    fn drop(&mut self) {
        self.cancel();
    }
}
