//! blockledger - A single-node proof-of-work ledger with UTXO accounting
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`blockchain`] - Blocks, the ledger service, chain traversal and UTXO scans
//! - [`transaction`] - Transaction types and the transfer builder
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work sealing and validation
//!
//! ## State Management
//! - [`persistence`] - Database layer (SQLite)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - Command-line surface

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;

pub use blockchain::{Block, Blockchain};
pub use error::{ChainError, Result};
pub use transaction::{Transaction, TxInput, TxOutput};
