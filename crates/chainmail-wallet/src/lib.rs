#![deny(missing_docs)]

//! # chainmail-wallet
//!
//! High-level messaging on top of an Electrum server.
//!
//! A [`Messenger`] holds one key pair and a client implementing
//! [`ElectrumApi`](chainmail_electrum::ElectrumApi). It sends messages as
//! signed transactions and reads them back by scanning the address
//! history.
//!
//! # Example
//!
//! ```no_run
//! use chainmail_electrum::{ElectrumClient, ElectrumConfig};
//! use chainmail_keys::PublicKey;
//! use chainmail_wallet::{Messenger, MessengerConfig};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), chainmail_wallet::WalletError> {
//! let client = ElectrumClient::new(ElectrumConfig::new("electrum.example.org", 50002));
//! let messenger = Messenger::from_wif(
//!     "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn",
//!     MessengerConfig::default(),
//!     client,
//! )?;
//!
//! println!("address: {}", messenger.address());
//!
//! let bob = PublicKey::from_hex(
//!     "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
//! )?;
//! let receipt = messenger.send_message(&bob, "hello bob").await?;
//! println!("sent {}", receipt.txid);
//!
//! let inbox = messenger.scan_inbox().await?;
//! futures::pin_mut!(inbox);
//! while let Some(message) = inbox.next().await {
//!     println!("{}: {}", message.from_address, message.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod inbox;
pub mod messenger;
mod error;

pub use config::MessengerConfig;
pub use error::WalletError;
pub use inbox::{find_envelope, sender_public_key, InboxMessage};
pub use messenger::{Messenger, SendReceipt};
