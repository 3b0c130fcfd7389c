#![deny(missing_docs)]

//! Transaction assembly for on-chain messages.
//!
//! A message transaction spends every unspent output of the sender and has
//! exactly three outputs, in order:
//!
//! 1. a zero-value `OP_RETURN` output carrying the encrypted envelope,
//! 2. a small payment to the recipient's P2WPKH address,
//! 3. change back to the sender's P2WPKH address.
//!
//! [`draft_message_transaction`] computes the unsigned layout and
//! [`build_message_transaction`] signs it.

pub mod data_output;
pub mod draft;
pub mod fee;
pub mod sign;
mod error;

pub use data_output::{data_output_script, extract_data_payload, MAX_DATA_PAYLOAD};
pub use draft::{draft_message_transaction, MessageTxConfig, TransactionDraft, Utxo};
pub use error::TransactionError;
pub use fee::{estimate_vsize, FeePolicy};
pub use sign::{build_message_transaction, sign_draft, SignedTransaction};
