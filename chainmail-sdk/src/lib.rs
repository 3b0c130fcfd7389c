#![deny(missing_docs)]

//! Chainmail SDK - complete SDK.
//!
//! Re-exports all chainmail components for convenient single-crate usage.

pub use chainmail_electrum as electrum;
pub use chainmail_keys as keys;
pub use chainmail_message as message;
pub use chainmail_transaction as transaction;
pub use chainmail_wallet as wallet;

pub use chainmail_wallet::{InboxMessage, Messenger, MessengerConfig, SendReceipt, WalletError};
