pub mod block;
pub mod chain;
pub mod iterator;
pub mod utxo;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use iterator::*;
pub use utxo::*;
