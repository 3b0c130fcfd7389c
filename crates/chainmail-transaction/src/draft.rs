//! Unsigned message transaction layout.

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use chainmail_keys::PublicKey;
use tracing::debug;

use crate::data_output::data_output_script;
use crate::fee::FeePolicy;
use crate::TransactionError;

/// Index of the data output.
pub const DATA_OUTPUT: usize = 0;
/// Index of the recipient payment output.
pub const PAYMENT_OUTPUT: usize = 1;
/// Index of the change output.
pub const CHANGE_OUTPUT: usize = 2;

/// A spendable output of the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Id of the transaction that created the output.
    pub txid: Txid,
    /// Output index within that transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    /// Locking script of the output.
    pub script_pubkey: ScriptBuf,
}

impl Utxo {
    /// The outpoint this UTXO is spent by.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Everything needed to lay out a message transaction.
#[derive(Debug, Clone)]
pub struct MessageTxConfig {
    /// Outputs to spend. All of them are used.
    pub utxos: Vec<Utxo>,
    /// Recipient of the message and of the payment.
    pub recipient: PublicKey,
    /// Serialized envelope for the data output.
    pub envelope: Vec<u8>,
    /// Fee and payment sizing.
    pub fee_policy: FeePolicy,
    /// Satoshis per virtual byte, used by [`FeePolicy::PerByte`].
    pub fee_rate: u64,
}

/// An unsigned message transaction.
///
/// Invariant: `total_input() == total_output() + fee`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    /// Inputs, in spending order.
    pub inputs: Vec<Utxo>,
    /// Data, payment and change outputs, in that order.
    pub outputs: Vec<TxOut>,
    /// Fee left to the miner.
    pub fee: u64,
}

impl TransactionDraft {
    /// Sum of input values.
    pub fn total_input(&self) -> u64 {
        self.inputs.iter().map(|utxo| utxo.value).sum()
    }

    /// Sum of output values.
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|output| output.value.to_sat()).sum()
    }

    /// Whether inputs exactly cover outputs plus fee.
    pub fn is_balanced(&self) -> bool {
        self.total_output().checked_add(self.fee) == Some(self.total_input())
    }

    /// Value returned to the sender.
    pub fn change(&self) -> u64 {
        self.outputs
            .get(CHANGE_OUTPUT)
            .map_or(0, |output| output.value.to_sat())
    }

    /// The transaction with empty witnesses.
    pub fn unsigned_transaction(&self) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: self
                .inputs
                .iter()
                .map(|utxo| TxIn {
                    previous_output: utxo.outpoint(),
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: self.outputs.clone(),
        }
    }
}

/// Lay out a message transaction from `sender` without signing it.
///
/// # Arguments
/// * `sender` - Public key that receives the change.
/// * `config` - Inputs, recipient, envelope and fee policy.
///
/// # Returns
/// The balanced draft, or `InsufficientFunds` when there is nothing to
/// spend, `NegativeChange` when the inputs do not cover payment and fee,
/// or `PayloadTooLarge` when the envelope does not fit in a data output.
pub fn draft_message_transaction(
    sender: &PublicKey,
    config: &MessageTxConfig,
) -> Result<TransactionDraft, TransactionError> {
    if config.utxos.is_empty() {
        return Err(TransactionError::InsufficientFunds);
    }

    let payment = config.fee_policy.payment();
    let mut outputs = vec![
        TxOut {
            value: Amount::ZERO,
            script_pubkey: data_output_script(&config.envelope)?,
        },
        TxOut {
            value: Amount::from_sat(payment),
            script_pubkey: config.recipient.p2wpkh_script(),
        },
        TxOut {
            value: Amount::ZERO,
            script_pubkey: sender.p2wpkh_script(),
        },
    ];

    let fee = config
        .fee_policy
        .fee(config.utxos.len(), &outputs, config.fee_rate);
    let available = config
        .utxos
        .iter()
        .fold(0u64, |total, utxo| total.saturating_add(utxo.value));
    let required = payment.saturating_add(fee);
    let change = available
        .checked_sub(required)
        .ok_or(TransactionError::NegativeChange {
            available,
            required,
        })?;
    outputs[CHANGE_OUTPUT].value = Amount::from_sat(change);

    debug!(
        inputs = config.utxos.len(),
        available, payment, fee, change, "drafted message transaction"
    );

    Ok(TransactionDraft {
        inputs: config.utxos.clone(),
        outputs,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_output::extract_data_payload;
    use bitcoin::hashes::Hash;
    use chainmail_keys::KeyPair;

    fn key(n: u8) -> KeyPair {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        KeyPair::from_secret_bytes(&bytes).unwrap()
    }

    fn utxo(owner: &KeyPair, n: u8, value: u64) -> Utxo {
        Utxo {
            txid: Txid::from_byte_array([n; 32]),
            vout: u32::from(n),
            value,
            script_pubkey: owner.public_key().p2wpkh_script(),
        }
    }

    fn config(utxos: Vec<Utxo>, recipient: &KeyPair) -> MessageTxConfig {
        MessageTxConfig {
            utxos,
            recipient: *recipient.public_key(),
            envelope: b"CMSG00:AA==".to_vec(),
            fee_policy: FeePolicy::default(),
            fee_rate: 1,
        }
    }

    #[test]
    fn test_single_utxo_scenario() {
        let sender = key(1);
        let recipient = key(2);
        let draft = draft_message_transaction(
            sender.public_key(),
            &config(vec![utxo(&sender, 1, 100_000)], &recipient),
        )
        .unwrap();

        assert_eq!(draft.fee, 500);
        assert_eq!(draft.outputs.len(), 3);
        assert_eq!(draft.outputs[DATA_OUTPUT].value, Amount::ZERO);
        assert_eq!(draft.outputs[PAYMENT_OUTPUT].value.to_sat(), 1000);
        assert_eq!(draft.change(), 98_500);
        assert_eq!(draft.total_output(), draft.total_input() - draft.fee);
        assert!(draft.is_balanced());
    }

    #[test]
    fn test_output_scripts() {
        let sender = key(1);
        let recipient = key(2);
        let draft = draft_message_transaction(
            sender.public_key(),
            &config(vec![utxo(&sender, 1, 5_000)], &recipient),
        )
        .unwrap();

        assert_eq!(
            extract_data_payload(&draft.outputs[DATA_OUTPUT].script_pubkey),
            Some(b"CMSG00:AA==".to_vec())
        );
        assert_eq!(
            draft.outputs[PAYMENT_OUTPUT].script_pubkey,
            recipient.public_key().p2wpkh_script()
        );
        assert_eq!(
            draft.outputs[CHANGE_OUTPUT].script_pubkey,
            sender.public_key().p2wpkh_script()
        );
    }

    #[test]
    fn test_all_utxos_are_spent() {
        let sender = key(1);
        let utxos = vec![utxo(&sender, 1, 700), utxo(&sender, 2, 800), utxo(&sender, 3, 900)];
        let draft =
            draft_message_transaction(sender.public_key(), &config(utxos.clone(), &key(2))).unwrap();

        assert_eq!(draft.inputs, utxos);
        assert_eq!(draft.change(), 2400 - 1500);

        let tx = draft.unsigned_transaction();
        assert_eq!(tx.input.len(), 3);
        assert_eq!(tx.input[1].previous_output, utxos[1].outpoint());
        assert!(tx.input.iter().all(|input| input.witness.is_empty()));
    }

    #[test]
    fn test_no_utxos() {
        let sender = key(1);
        let err = draft_message_transaction(sender.public_key(), &config(vec![], &key(2)))
            .unwrap_err();
        assert!(matches!(err, TransactionError::InsufficientFunds));
    }

    #[test]
    fn test_negative_change() {
        let sender = key(1);
        let err = draft_message_transaction(
            sender.public_key(),
            &config(vec![utxo(&sender, 1, 1499)], &key(2)),
        )
        .unwrap_err();
        match err {
            TransactionError::NegativeChange {
                available,
                required,
            } => {
                assert_eq!(available, 1499);
                assert_eq!(required, 1500);
            }
            other => panic!("expected NegativeChange, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_amount_leaves_zero_change() {
        let sender = key(1);
        let draft = draft_message_transaction(
            sender.public_key(),
            &config(vec![utxo(&sender, 1, 1500)], &key(2)),
        )
        .unwrap();
        assert_eq!(draft.outputs.len(), 3);
        assert_eq!(draft.change(), 0);
        assert!(draft.is_balanced());
    }

    #[test]
    fn test_per_byte_policy() {
        let sender = key(1);
        let mut cfg = config(vec![utxo(&sender, 1, 50_000)], &key(2));
        cfg.fee_policy = FeePolicy::PerByte { payment: 546 };
        cfg.fee_rate = 3;

        let draft = draft_message_transaction(sender.public_key(), &cfg).unwrap();
        let vsize = crate::fee::estimate_vsize(1, &draft.outputs);
        assert_eq!(draft.fee, 3 * vsize);
        assert_eq!(draft.outputs[PAYMENT_OUTPUT].value.to_sat(), 546);
        assert!(draft.is_balanced());
    }

    #[test]
    fn test_oversized_envelope() {
        let sender = key(1);
        let mut cfg = config(vec![utxo(&sender, 1, 50_000)], &key(2));
        cfg.envelope = vec![b'x'; 600];
        let err = draft_message_transaction(sender.public_key(), &cfg).unwrap_err();
        assert!(matches!(err, TransactionError::PayloadTooLarge { size: 600, .. }));
    }
}
