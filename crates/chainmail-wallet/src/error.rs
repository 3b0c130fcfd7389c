//! Wallet error types.

use chainmail_electrum::ElectrumError;
use chainmail_keys::KeyError;
use chainmail_transaction::TransactionError;

/// Errors that can occur during wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Key or address error.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Indexing server error.
    #[error(transparent)]
    Electrum(#[from] ElectrumError),

    /// Transaction assembly error.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The server reported an unspent output with an unusable outpoint.
    #[error("invalid unspent output {tx_hash}: {reason}")]
    InvalidUtxo {
        /// Transaction id as reported by the server.
        tx_hash: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A raw transaction from the server could not be decoded.
    #[error("invalid raw transaction: {0}")]
    InvalidRawTransaction(String),
}
