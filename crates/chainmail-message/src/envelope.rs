//! Tagged envelopes carried in data outputs.

use crate::MessageError;

/// Tag that marks a data output as carrying a message.
pub const PROTOCOL_TAG: [u8; 4] = *b"CMSG";

/// A protocol tag followed by an encrypted body.
///
/// Serialized as `tag || body`, where the body is the UTF-8 text
/// `hex(iv) ":" base64(ciphertext)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Four-byte protocol tag.
    pub tag: [u8; 4],
    /// Encrypted body text.
    pub body: String,
}

impl Envelope {
    /// Wrap an encrypted body.
    pub fn new(tag: [u8; 4], body: impl Into<String>) -> Self {
        Envelope {
            tag,
            body: body.into(),
        }
    }

    /// Serialize as `tag || body`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.tag.len() + self.body.len());
        bytes.extend_from_slice(&self.tag);
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }

    /// Decode `tag || body`, requiring `expected_tag`.
    pub fn decode(bytes: &[u8], expected_tag: &[u8; 4]) -> Result<Self, MessageError> {
        if bytes.len() < expected_tag.len() {
            return Err(MessageError::MalformedEnvelope(format!(
                "{} bytes is shorter than the tag",
                bytes.len()
            )));
        }
        let (tag, body) = bytes.split_at(expected_tag.len());
        if tag != expected_tag {
            return Err(MessageError::MalformedEnvelope(format!(
                "unexpected tag {}",
                hex::encode(tag)
            )));
        }
        let body = std::str::from_utf8(body)
            .map_err(|e| MessageError::MalformedEnvelope(e.to_string()))?;
        Ok(Envelope::new(*expected_tag, body))
    }

    /// [`decode`](Envelope::decode), returning `None` for anything that is
    /// not an envelope with `expected_tag`.
    pub fn parse(bytes: &[u8], expected_tag: &[u8; 4]) -> Option<Self> {
        Self::decode(bytes, expected_tag).ok()
    }
}
