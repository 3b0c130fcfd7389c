//! Signing of message transactions.

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{ecdsa, Amount, Transaction, Txid, Witness};
use chainmail_keys::KeyPair;

use crate::draft::{draft_message_transaction, MessageTxConfig, TransactionDraft};
use crate::TransactionError;

/// A fully signed transaction, ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The transaction.
    pub tx: Transaction,
    /// Its id.
    pub txid: Txid,
    /// Consensus serialization, hex-encoded.
    pub raw: String,
}

/// Sign every input of `draft` with `key`.
///
/// Each input gets a BIP-143 `SIGHASH_ALL` signature and the witness
/// `[signature, public_key]`. Every input must be locked to `key`'s
/// P2WPKH script.
pub fn sign_draft(
    draft: &TransactionDraft,
    key: &KeyPair,
) -> Result<SignedTransaction, TransactionError> {
    let secp = Secp256k1::signing_only();
    let own_script = key.public_key().p2wpkh_script();
    let public_key = key.public_key().to_bytes();

    let mut sighasher = SighashCache::new(draft.unsigned_transaction());
    for (index, utxo) in draft.inputs.iter().enumerate() {
        if utxo.script_pubkey != own_script {
            return Err(TransactionError::Signing(format!(
                "input {index} ({}) is not locked to the signing key",
                utxo.outpoint()
            )));
        }

        let sighash = sighasher
            .p2wpkh_signature_hash(
                index,
                &utxo.script_pubkey,
                Amount::from_sat(utxo.value),
                EcdsaSighashType::All,
            )
            .map_err(|e| TransactionError::Signing(e.to_string()))?;
        let message = Message::from_digest(sighash.to_byte_array());
        let signature = ecdsa::Signature {
            signature: secp.sign_ecdsa(&message, key.secret_key()),
            sighash_type: EcdsaSighashType::All,
        };

        let witness = sighasher
            .witness_mut(index)
            .ok_or_else(|| TransactionError::Signing(format!("input {index} out of range")))?;
        let mut stack = Witness::new();
        stack.push(signature.to_vec());
        stack.push(public_key);
        *witness = stack;
    }

    let tx = sighasher.into_transaction();
    Ok(SignedTransaction {
        txid: tx.compute_txid(),
        raw: serialize_hex(&tx),
        tx,
    })
}

/// Lay out and sign a message transaction from `sender`.
///
/// # Arguments
/// * `sender` - Key that owns every UTXO in `config` and receives change.
/// * `config` - Inputs, recipient, envelope and fee policy.
///
/// # Returns
/// The signed transaction and its draft.
pub fn build_message_transaction(
    sender: &KeyPair,
    config: &MessageTxConfig,
) -> Result<(TransactionDraft, SignedTransaction), TransactionError> {
    let draft = draft_message_transaction(sender.public_key(), config)?;
    let signed = sign_draft(&draft, sender)?;
    Ok((draft, signed))
}
