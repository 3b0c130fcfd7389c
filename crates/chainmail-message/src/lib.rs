#![deny(missing_docs)]

//! Encrypted message codec for on-chain messaging.
//!
//! Two parties derive the same [`SharedSecret`] from their own private key
//! and the other party's public key. Message text is encrypted under that
//! secret with AES-256-CBC and a fresh random IV, and serialized as
//! `hex(iv) ":" base64(ciphertext)`. On chain, the text is prefixed with a
//! four-byte protocol tag to form an [`Envelope`].
//!
//! ```
//! use chainmail_message::{decrypt, encrypt};
//! use k256::SecretKey;
//!
//! let alice = SecretKey::random(&mut rand::rngs::OsRng);
//! let bob = SecretKey::random(&mut rand::rngs::OsRng);
//!
//! let body = encrypt("hi bob", &bob.public_key(), &alice);
//! assert_eq!(decrypt(&body, &alice.public_key(), &bob), "hi bob");
//! ```

mod codec;
mod envelope;
mod error;
mod secret;

pub use codec::{decrypt, encrypt, try_decrypt};
pub use envelope::{Envelope, PROTOCOL_TAG};
pub use error::MessageError;
pub use secret::SharedSecret;
