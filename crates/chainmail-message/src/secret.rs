//! Per-conversation shared secrets.

use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};

/// 32-byte symmetric key shared by the two parties of a conversation.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Derive the secret for a conversation.
    ///
    /// The ECDH point `their_public * my_secret` is serialized in compressed
    /// SEC1 form, hex-encoded in lowercase, and the SHA-256 of that hex
    /// *text* is the key. Hashing the text rather than the point bytes is
    /// what deployed messages were encrypted with and must not change.
    ///
    /// The result is symmetric: `derive(a, B) == derive(b, A)`.
    pub fn derive(my_secret: &SecretKey, their_public: &PublicKey) -> Self {
        let point = (their_public.to_projective() * *my_secret.to_nonzero_scalar()).to_affine();
        let encoded = hex::encode(point.to_encoded_point(true).as_bytes());
        SharedSecret(Sha256::digest(encoded.as_bytes()).into())
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}
