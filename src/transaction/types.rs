/// Transaction types for blockledger
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Amount minted by every coinbase transaction.
pub const SUBSIDY: u64 = 10;

/// Output index carried by the sentinel input of a coinbase transaction.
pub const COINBASE_OUTPUT_INDEX: i64 = -1;

/// Reference to an output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    #[serde(with = "serde_bytes")]
    pub prev_tx_id: Vec<u8>,
    pub output_index: i64,
    /// Plaintext capability, compared against the locking address.
    pub unlocking_data: String,
}

impl TxInput {
    pub fn new(prev_tx_id: Vec<u8>, output_index: i64, unlocking_data: impl Into<String>) -> Self {
        Self {
            prev_tx_id,
            output_index,
            unlocking_data: unlocking_data.into(),
        }
    }

    pub fn can_unlock_output_with(&self, unlocking_data: &str) -> bool {
        self.unlocking_data == unlocking_data
    }
}

/// Value locked to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub locking_address: String,
}

impl TxOutput {
    pub fn new(value: u64, locking_address: impl Into<String>) -> Self {
        Self {
            value,
            locking_address: locking_address.into(),
        }
    }

    pub fn can_be_unlocked_with(&self, address: &str) -> bool {
        self.locking_address == address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "serde_bytes")]
    pub id: Vec<u8>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Builds a transaction and assigns its id from the finished inputs and outputs.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Result<Self> {
        let mut tx = Transaction {
            id: Vec::new(),
            inputs,
            outputs,
        };
        tx.set_id()?;
        Ok(tx)
    }

    /// Mints `SUBSIDY` to `address`. An empty memo is replaced by a reward note.
    pub fn new_coinbase(address: &str, memo: &str) -> Result<Self> {
        let memo = if memo.is_empty() {
            format!("Reward to {}", address)
        } else {
            memo.to_string()
        };
        let input = TxInput::new(Vec::new(), COINBASE_OUTPUT_INDEX, memo);
        let output = TxOutput::new(SUBSIDY, address);
        Transaction::new(vec![input], vec![output])
    }

    /// SHA-256 of the bincode encoding of this transaction with `id` cleared.
    pub fn compute_id(&self) -> Result<Vec<u8>> {
        let unidentified = Transaction {
            id: Vec::new(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        };
        let encoded = bincode::serialize(&unidentified)?;
        Ok(Sha256::digest(&encoded).to_vec())
    }

    pub fn set_id(&mut self) -> Result<()> {
        self.id = self.compute_id()?;
        Ok(())
    }

    pub fn id_hex(&self) -> String {
        hex::encode(&self.id)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].output_index == COINBASE_OUTPUT_INDEX
            && self.inputs[0].prev_tx_id.is_empty()
    }

    pub fn total_output_value(&self) -> Result<u64> {
        self.outputs.iter().try_fold(0u64, |acc, out| {
            acc.checked_add(out.value).ok_or_else(|| {
                ChainError::InvalidAmount(format!(
                    "output total of transaction {} overflows",
                    self.id_hex()
                ))
            })
        })
    }
}
