#![deny(missing_docs)]

//! Key material for chainmail.
//!
//! Provides the pieces of a wallet that the messaging layer treats as a
//! black box:
//! - Network parameter sets (bech32 prefix, WIF and extended-key versions)
//! - WIF private-key import/export
//! - Compressed secp256k1 public keys
//! - Pay-to-witness-public-key-hash addresses and locking scripts
//!
//! Curve arithmetic, hashing of witness programs and bech32 encoding are
//! delegated to the `bitcoin` and `bech32` crates.

pub mod address;
pub mod key;
pub mod network;

mod error;
pub use address::Address;
pub use error::KeyError;
pub use key::{KeyPair, PublicKey};
pub use network::NetworkParams;
