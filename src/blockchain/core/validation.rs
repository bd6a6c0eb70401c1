use super::iterator::ChainSnapshot;
use crate::error::{ChainError, Result};
use crate::transaction::{Transaction, TxOutput};
use std::collections::{HashMap, HashSet};

/// Outpoint (transaction id, output index) to the output it names.
type OutputSet = HashMap<(Vec<u8>, i64), TxOutput>;

impl ChainSnapshot<'_> {
    /// Every unspent output on the chain, for any address.
    pub fn unspent_output_set(&self) -> Result<OutputSet> {
        let mut spent: HashSet<(Vec<u8>, i64)> = HashSet::new();
        let mut unspent = OutputSet::new();

        for block in self.iter() {
            let block = block?;
            for tx in block.transactions.into_iter().rev() {
                let is_coinbase = tx.is_coinbase();
                for (index, out) in tx.outputs.into_iter().enumerate() {
                    let outpoint = (tx.id.clone(), index as i64);
                    if !spent.contains(&outpoint) {
                        unspent.insert(outpoint, out);
                    }
                }
                if !is_coinbase {
                    for input in tx.inputs {
                        spent.insert((input.prev_tx_id, input.output_index));
                    }
                }
            }
        }

        Ok(unspent)
    }

    /// Checks a batch of transactions about to be mined on top of this snapshot.
    ///
    /// Transactions are applied in order, so a later one may spend an output
    /// created earlier in the same batch.
    pub fn validate_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let mut unspent = self.unspent_output_set()?;
        for tx in transactions {
            validate_transaction(tx, &mut unspent)?;
        }
        Ok(())
    }
}

/// Validates `tx` against `unspent` and applies it: its inputs are removed and
/// its outputs added.
fn validate_transaction(tx: &Transaction, unspent: &mut OutputSet) -> Result<()> {
    if tx.compute_id()? != tx.id {
        return Err(ChainError::InvalidTransaction(format!(
            "transaction {} id does not match its contents",
            tx.id_hex()
        )));
    }

    let output_total = tx.total_output_value()?;

    if !tx.is_coinbase() {
        if tx.inputs.is_empty() {
            return Err(ChainError::InvalidTransaction(format!(
                "transaction {} has no inputs",
                tx.id_hex()
            )));
        }

        let mut input_total: u64 = 0;
        for input in &tx.inputs {
            // Removing the outpoint also rejects an input repeated within the transaction.
            let outpoint = (input.prev_tx_id.clone(), input.output_index);
            let output = unspent.remove(&outpoint).ok_or_else(|| {
                ChainError::InvalidTransaction(format!(
                    "transaction {} spends missing or already spent output {}:{}",
                    tx.id_hex(),
                    hex::encode(&input.prev_tx_id),
                    input.output_index
                ))
            })?;

            if !input.can_unlock_output_with(&output.locking_address) {
                return Err(ChainError::InvalidTransaction(format!(
                    "transaction {} cannot unlock output {}:{}",
                    tx.id_hex(),
                    hex::encode(&input.prev_tx_id),
                    input.output_index
                )));
            }

            input_total = input_total.checked_add(output.value).ok_or_else(|| {
                ChainError::InvalidAmount(format!(
                    "input total of transaction {} overflows",
                    tx.id_hex()
                ))
            })?;
        }

        if input_total < output_total {
            return Err(ChainError::InvalidTransaction(format!(
                "transaction {} spends {} but only has {}",
                tx.id_hex(),
                output_total,
                input_total
            )));
        }
    }

    for (index, out) in tx.outputs.iter().enumerate() {
        unspent.insert((tx.id.clone(), index as i64), out.clone());
    }
    Ok(())
}
