#![deny(missing_docs)]

//! # chainmail-electrum
//!
//! Client for Electrum-protocol indexing servers.
//!
//! One [`ElectrumClient`] owns one persistent stream (plain TCP or TLS) to
//! the server. Requests are newline-delimited JSON objects carrying a
//! per-connection increasing id; responses are matched back to their
//! callers by id, so any number of calls may be in flight and the server
//! may answer them in any order.
//!
//! # Example
//!
//! ```no_run
//! use chainmail_electrum::{ElectrumClient, ElectrumConfig, ScriptHash};
//!
//! # async fn example() -> Result<(), chainmail_electrum::ElectrumError> {
//! let client = ElectrumClient::new(ElectrumConfig::new("electrum.example.org", 50002));
//!
//! let script_hash = ScriptHash::from_script(&hex::decode("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap());
//! let balance = client.get_balance(&script_hash).await?;
//! println!("confirmed: {}", balance.confirmed);
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod types;

mod framing;
mod transport;

#[cfg(test)]
mod tests;

pub use client::{ElectrumApi, ElectrumClient};
pub use connection::Connection;
pub use error::ElectrumError;
pub use types::{Balance, ElectrumConfig, HistoryItem, ScriptHash, TransportKind, UnspentOutput};
