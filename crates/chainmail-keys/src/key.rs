//! secp256k1 key pairs and compressed public keys.
//!
//! Private keys are imported from WIF; only the compressed form is
//! accepted because witness key-hash outputs commit to the 33-byte key.

use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::{self, Secp256k1, SecretKey};
use bitcoin::{CompressedPublicKey, ScriptBuf, WPubkeyHash};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::network::NetworkParams;
use crate::KeyError;

/// Length of a private key scalar in bytes.
const SECRET_KEY_LEN: usize = 32;

/// Length of a compressed public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Compression flag appended to the scalar in a WIF payload.
const COMPRESS_MAGIC: u8 = 0x01;

/// Decoded length of a compressed WIF: version + scalar + flag + checksum.
const COMPRESSED_WIF_LEN: usize = 1 + SECRET_KEY_LEN + 1 + 4;

/// A compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(CompressedPublicKey);

impl PublicKey {
    /// Parse a 33-byte SEC1 compressed public key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                PUBLIC_KEY_LEN,
                bytes.len()
            )));
        }
        CompressedPublicKey::from_slice(bytes)
            .map(PublicKey)
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
    }

    /// Parse a hex-encoded compressed public key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim())?;
        Self::from_slice(&bytes)
    }

    /// Serialize to the 33-byte compressed encoding.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.to_bytes()
    }

    /// Lowercase hex of the compressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The underlying `bitcoin` public key.
    pub fn inner(&self) -> &CompressedPublicKey {
        &self.0
    }

    /// HASH160 of the compressed key, the witness v0 program.
    pub fn wpubkey_hash(&self) -> WPubkeyHash {
        self.0.wpubkey_hash()
    }

    /// Locking script paying to this key: `OP_0 <20-byte key hash>`.
    pub fn p2wpkh_script(&self) -> ScriptBuf {
        ScriptBuf::new_p2wpkh(&self.wpubkey_hash())
    }

    /// The bech32 witness key-hash address of this key on `params`.
    pub fn address(&self, params: &NetworkParams) -> Result<Address, KeyError> {
        Address::p2wpkh(self, params)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// A private scalar together with its compressed public key.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Create a key pair from a raw 32-byte big-endian scalar.
    ///
    /// # Arguments
    /// * `bytes` - The private key scalar.
    ///
    /// # Returns
    /// `Ok(KeyPair)` if the scalar is in `1..n`, otherwise `InvalidPrivateKey`.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(KeyError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_LEN,
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_secret_key(secret))
    }

    /// Wrap an existing `secp256k1` secret key.
    pub fn from_secret_key(secret: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let point = secp256k1::PublicKey::from_secret_key(&secp, &secret);
        KeyPair {
            secret,
            public: PublicKey(CompressedPublicKey(point)),
        }
    }

    /// Generate a fresh key pair from the OS random number generator.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        loop {
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(pair) = Self::from_secret_bytes(&bytes) {
                return pair;
            }
        }
    }

    /// Decode a compressed WIF private key for the given network.
    ///
    /// # Arguments
    /// * `wif` - The base58check string.
    /// * `params` - The network whose WIF version byte is expected.
    ///
    /// # Returns
    /// The key pair, or an error if the string is malformed, the checksum
    /// fails, the key is uncompressed, or the version byte belongs to
    /// another network.
    pub fn from_wif(wif: &str, params: &NetworkParams) -> Result<Self, KeyError> {
        let decoded = bs58::decode(wif.trim())
            .into_vec()
            .map_err(|e| KeyError::InvalidWif(e.to_string()))?;

        if decoded.len() != COMPRESSED_WIF_LEN {
            return Err(KeyError::InvalidWif(format!(
                "expected a compressed key of {} bytes, got {}",
                COMPRESSED_WIF_LEN,
                decoded.len()
            )));
        }

        let (payload, checksum) = decoded.split_at(COMPRESSED_WIF_LEN - 4);
        if sha256d(payload)[..4] != *checksum {
            return Err(KeyError::ChecksumMismatch);
        }

        if payload[0] != params.wif {
            return Err(KeyError::NetworkMismatch {
                network: params.name.clone(),
                expected: params.wif,
                found: payload[0],
            });
        }

        if payload[1 + SECRET_KEY_LEN] != COMPRESS_MAGIC {
            return Err(KeyError::InvalidWif(
                "invalid compression flag".to_string(),
            ));
        }

        Self::from_secret_bytes(&payload[1..1 + SECRET_KEY_LEN])
    }

    /// Encode the private key as compressed WIF for `params`.
    pub fn to_wif(&self, params: &NetworkParams) -> String {
        let mut payload = Vec::with_capacity(COMPRESSED_WIF_LEN);
        payload.push(params.wif);
        payload.extend_from_slice(&self.secret.secret_bytes());
        payload.push(COMPRESS_MAGIC);

        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// The private scalar.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// The private scalar as 32 big-endian bytes.
    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.secret.secret_bytes()
    }

    /// The compressed public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// This key's witness key-hash address on `params`.
    pub fn address(&self, params: &NetworkParams) -> Result<Address, KeyError> {
        self.public.address(params)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}
