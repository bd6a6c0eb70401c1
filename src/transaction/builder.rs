//! Assembling transfers from spendable outputs.

use super::types::{Transaction, TxInput, TxOutput};
use crate::error::{ChainError, Result};

/// Outputs selected to cover a payment, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendableOutputs {
    pub total: u64,
    pub selected: Vec<(Vec<u8>, Vec<i64>)>,
}

impl SpendableOutputs {
    pub fn push(&mut self, tx_id: &[u8], output_index: i64, value: u64) -> Result<()> {
        self.total = self.total.checked_add(value).ok_or_else(|| {
            ChainError::InvalidAmount("total of selected outputs overflows".to_string())
        })?;
        match self.selected.last_mut() {
            Some((last_id, indices)) if last_id.as_slice() == tx_id => indices.push(output_index),
            _ => self.selected.push((tx_id.to_vec(), vec![output_index])),
        }
        Ok(())
    }

    pub fn output_count(&self) -> usize {
        self.selected.iter().map(|(_, indices)| indices.len()).sum()
    }
}

/// Anything that can pick outputs owned by an address to cover an amount.
pub trait SpendableOutputSource {
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs>;
}

impl Transaction {
    /// Moves `amount` from `from` to `to`, returning change to `from` when the
    /// selected outputs overshoot.
    pub fn new_utxo_transaction<S>(from: &str, to: &str, amount: u64, source: &S) -> Result<Self>
    where
        S: SpendableOutputSource + ?Sized,
    {
        if amount == 0 {
            return Err(ChainError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }

        let spendable = source.find_spendable_outputs(from, amount)?;
        if spendable.total < amount {
            return Err(ChainError::InsufficientFunds {
                required: amount,
                available: spendable.total,
            });
        }

        let inputs: Vec<TxInput> = spendable
            .selected
            .iter()
            .flat_map(|(tx_id, indices)| {
                indices
                    .iter()
                    .map(move |&index| TxInput::new(tx_id.clone(), index, from))
            })
            .collect();

        let mut outputs = vec![TxOutput::new(amount, to)];
        if spendable.total > amount {
            outputs.push(TxOutput::new(spendable.total - amount, from));
        }

        Transaction::new(inputs, outputs)
    }
}
