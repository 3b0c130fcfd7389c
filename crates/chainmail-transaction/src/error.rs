//! Transaction assembly error types.

/// Errors that can occur while assembling or signing a message transaction.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The sender has no spendable outputs.
    #[error("insufficient funds: no spendable outputs")]
    InsufficientFunds,

    /// The inputs do not cover the recipient payment plus the fee.
    #[error("negative change: inputs total {available}, payment and fee need {required}")]
    NegativeChange {
        /// Total input value.
        available: u64,
        /// Payment plus fee.
        required: u64,
    },

    /// The envelope does not fit in a single data push.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Envelope size.
        size: usize,
        /// Largest allowed envelope.
        max: usize,
    },

    /// An input could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),
}
