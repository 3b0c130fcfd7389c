/// Errors produced while decoding or deriving key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The WIF string is not valid base58 or has the wrong shape.
    #[error("invalid WIF format: {0}")]
    InvalidWif(String),

    /// The base58check checksum did not match the payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The WIF version byte belongs to a different network.
    #[error("WIF version {found:#04x} does not match network {network} (expected {expected:#04x})")]
    NetworkMismatch {
        /// Name of the network the caller asked for.
        network: String,
        /// Version byte of that network.
        expected: u8,
        /// Version byte found in the WIF.
        found: u8,
    },

    /// The 32-byte scalar is zero or not below the curve order.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The bytes do not encode a compressed point on secp256k1.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The address string is not a witness v0 key-hash address for the network.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl From<hex::FromHexError> for KeyError {
    fn from(e: hex::FromHexError) -> Self {
        KeyError::InvalidPublicKey(format!("invalid hex: {e}"))
    }
}
