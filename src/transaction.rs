//! Transaction module split into types and the transfer builder

pub mod builder;
pub mod types;

pub use builder::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    /// Hands out a fixed list of (tx id, index, value) outputs first-fit.
    struct FixedOutputs(Vec<(Vec<u8>, i64, u64)>);

    impl SpendableOutputSource for FixedOutputs {
        fn find_spendable_outputs(&self, _address: &str, amount: u64) -> crate::error::Result<SpendableOutputs> {
            let mut spendable = SpendableOutputs::default();
            for (id, index, value) in &self.0 {
                if spendable.total >= amount {
                    break;
                }
                spendable.push(id, *index, *value)?;
            }
            Ok(spendable)
        }
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::new_coinbase("alice", "genesis").unwrap();
        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].output_index, COINBASE_OUTPUT_INDEX);
        assert!(tx.inputs[0].prev_tx_id.is_empty());
        assert_eq!(tx.inputs[0].unlocking_data, "genesis");
        assert_eq!(tx.outputs, vec![TxOutput::new(SUBSIDY, "alice")]);
        assert_eq!(tx.id.len(), 32);
    }

    #[test]
    fn test_coinbase_default_memo() {
        let tx = Transaction::new_coinbase("bob", "").unwrap();
        assert_eq!(tx.inputs[0].unlocking_data, "Reward to bob");
    }

    #[test]
    fn test_is_coinbase_rejects_other_shapes() {
        let with_prev = Transaction::new(
            vec![TxInput::new(vec![1, 2, 3], COINBASE_OUTPUT_INDEX, "x")],
            vec![TxOutput::new(1, "a")],
        )
        .unwrap();
        assert!(!with_prev.is_coinbase());

        let regular_index = Transaction::new(
            vec![TxInput::new(Vec::new(), 0, "x")],
            vec![TxOutput::new(1, "a")],
        )
        .unwrap();
        assert!(!regular_index.is_coinbase());

        let two_inputs = Transaction::new(
            vec![
                TxInput::new(Vec::new(), COINBASE_OUTPUT_INDEX, "x"),
                TxInput::new(Vec::new(), COINBASE_OUTPUT_INDEX, "y"),
            ],
            vec![TxOutput::new(1, "a")],
        )
        .unwrap();
        assert!(!two_inputs.is_coinbase());
    }

    #[test]
    fn test_id_is_stable() {
        let tx = Transaction::new_coinbase("alice", "memo").unwrap();
        assert_eq!(tx.compute_id().unwrap(), tx.id);
        assert_eq!(tx.compute_id().unwrap(), tx.compute_id().unwrap());

        // Re-encoding the finished transaction must not feed the id into itself.
        let decoded: Transaction = bincode::deserialize(&bincode::serialize(&tx).unwrap()).unwrap();
        assert_eq!(decoded.compute_id().unwrap(), tx.id);
    }

    #[test]
    fn test_id_changes_with_content_and_order() {
        let a = TxOutput::new(3, "a");
        let b = TxOutput::new(4, "b");
        let first = TxInput::new(vec![9; 32], 0, "a");
        let second = TxInput::new(vec![8; 32], 1, "a");
        let inputs = vec![first.clone(), second.clone()];
        let outputs = vec![a.clone(), b.clone()];

        let base = Transaction::new(inputs.clone(), outputs.clone()).unwrap();
        let variants = vec![
            // Output order, value and address.
            Transaction::new(inputs.clone(), vec![b.clone(), a.clone()]),
            Transaction::new(inputs.clone(), vec![TxOutput::new(5, "a"), b.clone()]),
            Transaction::new(inputs.clone(), vec![TxOutput::new(3, "c"), b.clone()]),
            // Input order, previous id, index and unlocking data.
            Transaction::new(vec![second.clone(), first.clone()], outputs.clone()),
            Transaction::new(vec![TxInput::new(vec![7; 32], 0, "a"), second.clone()], outputs.clone()),
            Transaction::new(vec![TxInput::new(vec![9; 32], 2, "a"), second.clone()], outputs.clone()),
            Transaction::new(vec![TxInput::new(vec![9; 32], 0, "z"), second.clone()], outputs.clone()),
            // Dropping an input or an output.
            Transaction::new(vec![first.clone()], outputs.clone()),
            Transaction::new(inputs.clone(), vec![a.clone()]),
        ];

        for variant in variants {
            let variant = variant.unwrap();
            assert_ne!(base.id, variant.id, "{:?}", variant);
        }
        assert_eq!(Transaction::new(inputs, outputs).unwrap().id, base.id);
    }

    #[test]
    fn test_spendable_outputs_total_overflow_is_rejected() {
        let mut spendable = SpendableOutputs::default();
        spendable.push(&[1], 0, u64::MAX).unwrap();
        let err = spendable.push(&[2], 0, 1).unwrap_err();
        assert!(matches!(err, ChainError::InvalidAmount(_)));
        assert_eq!(spendable.total, u64::MAX);
        assert_eq!(spendable.output_count(), 1);
    }

    #[test]
    fn test_utxo_transaction_with_change() {
        let source = FixedOutputs(vec![(vec![1; 32], 0, 10)]);
        let tx = Transaction::new_utxo_transaction("alice", "bob", 4, &source).unwrap();

        assert_eq!(tx.inputs, vec![TxInput::new(vec![1; 32], 0, "alice")]);
        assert_eq!(tx.outputs, vec![TxOutput::new(4, "bob"), TxOutput::new(6, "alice")]);
        assert_eq!(tx.id, tx.compute_id().unwrap());
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_utxo_transaction_exact_amount_has_no_change() {
        let source = FixedOutputs(vec![(vec![1; 32], 0, 6), (vec![2; 32], 1, 4)]);
        let tx = Transaction::new_utxo_transaction("alice", "bob", 10, &source).unwrap();

        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.inputs[0].prev_tx_id, vec![1; 32]);
        assert_eq!(tx.inputs[1].output_index, 1);
        assert_eq!(tx.outputs, vec![TxOutput::new(10, "bob")]);
    }

    #[test]
    fn test_utxo_transaction_insufficient_funds() {
        let source = FixedOutputs(vec![(vec![1; 32], 0, 10)]);
        let err = Transaction::new_utxo_transaction("alice", "bob", 100, &source).unwrap_err();
        assert_eq!(err, ChainError::InsufficientFunds { required: 100, available: 10 });
    }

    #[test]
    fn test_utxo_transaction_rejects_zero_amount() {
        let source = FixedOutputs(vec![(vec![1; 32], 0, 10)]);
        let err = Transaction::new_utxo_transaction("alice", "bob", 0, &source).unwrap_err();
        assert!(matches!(err, ChainError::InvalidAmount(_)));
    }

    #[test]
    fn test_spendable_outputs_groups_by_transaction() {
        let mut spendable = SpendableOutputs::default();
        spendable.push(&[1], 0, 2).unwrap();
        spendable.push(&[1], 2, 3).unwrap();
        spendable.push(&[7], 1, 5).unwrap();
        assert_eq!(spendable.total, 10);
        assert_eq!(spendable.output_count(), 3);
        assert_eq!(spendable.selected, vec![(vec![1], vec![0, 2]), (vec![7], vec![1])]);
    }
}
