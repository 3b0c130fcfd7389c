//! Message text encryption and decryption.
//!
//! Wire form of an encrypted body: `hex(iv) ":" base64(ciphertext)`, with
//! AES-256-CBC, PKCS#7 padding and a 16-byte IV.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use k256::{PublicKey, SecretKey};
use rand::RngCore;
use tracing::debug;

use crate::{MessageError, SharedSecret};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block and IV length.
const IV_LEN: usize = 16;

/// Separates the hex IV from the ciphertext.
const SEPARATOR: char = ':';

impl SharedSecret {
    /// Encrypt `plaintext` under this secret with a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    pub(crate) fn encrypt_with_iv(&self, plaintext: &str, iv: &[u8; IV_LEN]) -> String {
        let ciphertext = Aes256CbcEnc::new(self.key(), GenericArray::from_slice(iv))
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        format!(
            "{}{}{}",
            hex::encode(iv),
            SEPARATOR,
            base64::engine::general_purpose::STANDARD.encode(ciphertext)
        )
    }

    fn key(&self) -> &GenericArray<u8, aes::cipher::consts::U32> {
        GenericArray::from_slice(self.as_bytes())
    }

    /// Decrypt a body produced by [`encrypt`](SharedSecret::encrypt).
    ///
    /// A payload without a `:` is not an encrypted body; it is returned
    /// unchanged. Everything else must decrypt to non-empty UTF-8 text.
    pub fn try_decrypt(&self, payload: &str) -> Result<String, MessageError> {
        let Some((iv_hex, encoded)) = payload.split_once(SEPARATOR) else {
            return Ok(payload.to_string());
        };

        let iv: [u8; IV_LEN] = hex::decode(iv_hex)
            .map_err(|e| MessageError::InvalidIv(e.to_string()))?
            .try_into()
            .map_err(|bytes: Vec<u8>| {
                MessageError::InvalidIv(format!("expected {IV_LEN} bytes, got {}", bytes.len()))
            })?;
        let ciphertext = base64::engine::general_purpose::STANDARD.decode(encoded)?;

        let plaintext = Aes256CbcDec::new(self.key(), GenericArray::from_slice(&iv))
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| MessageError::DecryptionFailed("bad padding".to_string()))?;
        if plaintext.is_empty() {
            return Err(MessageError::DecryptionFailed("empty plaintext".to_string()));
        }
        String::from_utf8(plaintext)
            .map_err(|_| MessageError::DecryptionFailed("plaintext is not UTF-8".to_string()))
    }

    /// Like [`try_decrypt`](SharedSecret::try_decrypt), but returns the
    /// original payload when it cannot be decrypted.
    pub fn decrypt(&self, payload: &str) -> String {
        match self.try_decrypt(payload) {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "payload did not decrypt; passing it through");
                payload.to_string()
            }
        }
    }
}

/// Encrypt `plaintext` from the holder of `my_secret` to `their_public`.
///
/// # Returns
/// The encrypted body, `hex(iv) ":" base64(ciphertext)`.
pub fn encrypt(plaintext: &str, their_public: &PublicKey, my_secret: &SecretKey) -> String {
    SharedSecret::derive(my_secret, their_public).encrypt(plaintext)
}

/// Decrypt a body from the holder of `their_public`, failing on anything
/// that does not decrypt cleanly.
///
/// A payload without a `:` is passed through as `Ok`.
pub fn try_decrypt(
    payload: &str,
    their_public: &PublicKey,
    my_secret: &SecretKey,
) -> Result<String, MessageError> {
    SharedSecret::derive(my_secret, their_public).try_decrypt(payload)
}

/// Decrypt a body from the holder of `their_public`.
///
/// Never fails: a payload that cannot be decrypted (no `:`, wrong key,
/// corrupt data) is returned unchanged.
pub fn decrypt(payload: &str, their_public: &PublicKey, my_secret: &SecretKey) -> String {
    SharedSecret::derive(my_secret, their_public).decrypt(payload)
}
