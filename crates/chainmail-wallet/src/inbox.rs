//! Recognizing message transactions.

use bitcoin::{Transaction, Txid};
use chainmail_keys::{Address, PublicKey};
use chainmail_message::Envelope;
use chainmail_transaction::extract_data_payload;

/// A message recovered from the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    /// Public key of the sender.
    pub from: PublicKey,
    /// The sender's address on the messenger's network.
    pub from_address: Address,
    /// Decrypted text.
    pub text: String,
    /// Transaction that carried the message.
    pub txid: Txid,
}

/// The first data output of `tx` holding an envelope tagged `tag`.
pub fn find_envelope(tx: &Transaction, tag: &[u8; 4]) -> Option<Envelope> {
    tx.output
        .iter()
        .filter(|output| output.script_pubkey.is_op_return())
        .filter_map(|output| extract_data_payload(&output.script_pubkey))
        .find_map(|payload| Envelope::parse(&payload, tag))
}

/// The public key that signed the first input of `tx`.
///
/// Only a P2WPKH-shaped witness matches: exactly two stack elements, the
/// second a compressed public key.
pub fn sender_public_key(tx: &Transaction) -> Option<PublicKey> {
    let witness = &tx.input.first()?.witness;
    if witness.len() != 2 {
        return None;
    }
    PublicKey::from_slice(witness.nth(1)?).ok()
}
