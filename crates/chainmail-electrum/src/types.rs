//! Electrum data types: configuration, script hashes and method results.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stream transport used to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Plain TCP.
    Tcp,
    /// TLS over TCP.
    Tls,
}

/// Configuration for an [`ElectrumClient`](crate::ElectrumClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectrumConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Stream transport.
    pub transport: TransportKind,
    /// Skip certificate validation. Many public servers use self-signed
    /// certificates; enabling this trades server authentication for reach.
    pub accept_invalid_certs: bool,
}

impl ElectrumConfig {
    /// TLS configuration for `host:port` with certificate validation on.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

impl Default for ElectrumConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50002,
            transport: TransportKind::Tls,
            accept_invalid_certs: false,
        }
    }
}

/// Index key of a locking script: SHA-256 of the script, byte-reversed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHash([u8; 32]);

impl ScriptHash {
    /// Hash a serialized locking script.
    pub fn from_script(script: &[u8]) -> Self {
        let mut hash: [u8; 32] = Sha256::digest(script).into();
        hash.reverse();
        ScriptHash(hash)
    }

    /// The reversed hash bytes, in the order they are hex-encoded.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex string sent to the server.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptHash({})", self.to_hex())
    }
}

/// Result of `blockchain.scripthash.get_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Confirmed balance in the smallest unit.
    pub confirmed: i64,
    /// Unconfirmed delta; negative when mempool transactions spend confirmed coins.
    pub unconfirmed: i64,
}

/// One entry of `blockchain.scripthash.listunspent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// Funding transaction id (display hex).
    pub tx_hash: String,
    /// Output index within the funding transaction.
    pub tx_pos: u32,
    /// Output value in the smallest unit.
    pub value: u64,
    /// Confirmation height, 0 when unconfirmed.
    #[serde(default)]
    pub height: i64,
}

/// One entry of `blockchain.scripthash.get_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Transaction id (display hex).
    pub tx_hash: String,
    /// Confirmation height; 0 or negative for mempool transactions.
    #[serde(default)]
    pub height: i64,
    /// Fee, reported only for mempool transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
}
