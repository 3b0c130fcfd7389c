//! Network parameter sets.
//!
//! A chain is identified to this crate only through its version bytes and
//! its bech32 human-readable prefix, so forks and private chains can be
//! described without code changes.

use serde::{Deserialize, Serialize};

/// Version bytes and prefixes of a UTXO network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Short network name, used in error messages.
    pub name: String,
    /// Human-readable part of bech32 (segwit) addresses, e.g. `bc`.
    pub bech32_hrp: String,
    /// Base58 version byte for pay-to-public-key-hash addresses.
    pub pubkey_hash: u8,
    /// Base58 version byte for pay-to-script-hash addresses.
    pub script_hash: u8,
    /// Version byte prefixed to WIF private keys.
    pub wif: u8,
    /// Version of serialized extended public keys.
    pub bip32_public: u32,
    /// Version of serialized extended private keys.
    pub bip32_private: u32,
}

impl NetworkParams {
    /// Bitcoin mainnet.
    pub fn bitcoin() -> Self {
        Self {
            name: "bitcoin".to_string(),
            bech32_hrp: "bc".to_string(),
            pubkey_hash: 0x00,
            script_hash: 0x05,
            wif: 0x80,
            bip32_public: 0x0488_b21e,
            bip32_private: 0x0488_ade4,
        }
    }

    /// Bitcoin testnet.
    pub fn testnet() -> Self {
        Self {
            name: "testnet".to_string(),
            bech32_hrp: "tb".to_string(),
            pubkey_hash: 0x6f,
            script_hash: 0xc4,
            wif: 0xef,
            bip32_public: 0x0435_87cf,
            bip32_private: 0x0435_8394,
        }
    }

    /// Local regression-test network.
    pub fn regtest() -> Self {
        Self {
            name: "regtest".to_string(),
            bech32_hrp: "bcrt".to_string(),
            ..Self::testnet()
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::bitcoin()
    }
}
