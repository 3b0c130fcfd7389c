/// Reasons a payload could not be decoded as a message.
///
/// Every variant means "not a message this reader can open"; the inbox
/// scanner skips such payloads instead of reporting them.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The envelope is too short, carries another tag, or its body is not UTF-8.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The IV part is not 16 hex-encoded bytes.
    #[error("invalid IV: {0}")]
    InvalidIv(String),

    /// The ciphertext part is not valid base64.
    #[error("invalid ciphertext encoding: {0}")]
    InvalidCiphertext(#[from] base64::DecodeError),

    /// Decryption produced no usable text (wrong key or corrupt data).
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}
