//! Unspent-output scans over a chain snapshot.
//!
//! The chain is walked newest-first, so every input that spends an output is
//! seen before the transaction that created the output. Inputs are recorded in
//! a spent set keyed by transaction id; a transaction's outputs are checked
//! against that set before its own inputs are added.

use super::iterator::ChainSnapshot;
use crate::error::{ChainError, Result};
use crate::transaction::{SpendableOutputSource, SpendableOutputs, Transaction, TxOutput};
use std::collections::{HashMap, HashSet};

/// A transaction together with the indices of its outputs that are still
/// unspent and unlockable by the scanned address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentTransaction {
    pub transaction: Transaction,
    pub unspent_outputs: Vec<usize>,
}

impl UnspentTransaction {
    pub fn outputs(&self) -> impl Iterator<Item = (usize, &TxOutput)> {
        self.unspent_outputs
            .iter()
            .map(move |&index| (index, &self.transaction.outputs[index]))
    }
}

impl ChainSnapshot<'_> {
    pub fn scan_unspent(&self, address: &str) -> Result<Vec<UnspentTransaction>> {
        let mut spent: HashMap<Vec<u8>, HashSet<i64>> = HashMap::new();
        let mut unspent = Vec::new();

        for block in self.iter() {
            let block = block?;
            // Later transactions in a block may spend earlier ones.
            for tx in block.transactions.into_iter().rev() {
                let spent_here = spent.get(&tx.id);
                let unspent_outputs: Vec<usize> = tx
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|(index, out)| {
                        out.can_be_unlocked_with(address)
                            && !spent_here.is_some_and(|set| set.contains(&(*index as i64)))
                    })
                    .map(|(index, _)| index)
                    .collect();

                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        spent
                            .entry(input.prev_tx_id.clone())
                            .or_default()
                            .insert(input.output_index);
                    }
                }

                if !unspent_outputs.is_empty() {
                    unspent.push(UnspentTransaction {
                        transaction: tx,
                        unspent_outputs,
                    });
                }
            }
        }

        Ok(unspent)
    }

    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .scan_unspent(address)?
            .into_iter()
            .map(|entry| entry.transaction)
            .collect())
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        Ok(self
            .scan_unspent(address)?
            .iter()
            .flat_map(|entry| entry.outputs().map(|(_, out)| out.clone()))
            .collect())
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        self.find_utxo(address)?.iter().try_fold(0u64, |acc, out| {
            acc.checked_add(out.value).ok_or_else(|| {
                ChainError::InvalidAmount(format!("balance of {} overflows", address))
            })
        })
    }
}

impl SpendableOutputSource for ChainSnapshot<'_> {
    /// First fit in scan order; no sorting by value.
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs> {
        let mut spendable = SpendableOutputs::default();
        'scan: for entry in self.scan_unspent(address)? {
            for (index, out) in entry.outputs() {
                if spendable.total >= amount {
                    break 'scan;
                }
                spendable.push(&entry.transaction.id, index as i64, out.value)?;
            }
        }
        Ok(spendable)
    }
}
