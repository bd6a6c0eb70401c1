// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// blocks, the ledger service, chain traversal and unspent-output scans.

pub mod core;
pub use self::core::*;
