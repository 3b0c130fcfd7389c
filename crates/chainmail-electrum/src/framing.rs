//! Line-delimited JSON-RPC framing.
//!
//! Requests go out as one JSON object per line. Incoming bytes accumulate
//! in a [`LineBuffer`] until a newline completes a line; every complete
//! line is decoded on its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ElectrumError;

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

/// Serialize one request, newline included.
pub(crate) fn encode_request(
    id: u64,
    method: &str,
    params: &[Value],
) -> Result<Vec<u8>, ElectrumError> {
    let mut line = serde_json::to_vec(&Request {
        jsonrpc: "2.0",
        id,
        method,
        params,
    })?;
    line.push(b'\n');
    Ok(line)
}

/// A decoded server line. Notifications carry no id.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Response {
    /// Decode a single line. Anything but a JSON object is rejected, so a
    /// stray array can never be read positionally as a response.
    pub(crate) fn parse(line: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(line)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("expected a JSON object"));
        }
        serde_json::from_value(value)
    }

    /// The call outcome: the `result` field, or the server's error.
    pub(crate) fn into_result(self) -> Result<Value, ElectrumError> {
        match self.error {
            Some(error) if !error.is_null() => Err(rpc_error(error)),
            _ => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Servers send either `{"code": .., "message": ..}` or a bare string.
fn rpc_error(error: Value) -> ElectrumError {
    match error {
        Value::Object(ref fields) => {
            let code = fields.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = match fields.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => error.to_string(),
            };
            ElectrumError::Rpc { code, message }
        }
        Value::String(message) => ElectrumError::Rpc { code: 0, message },
        other => ElectrumError::Rpc {
            code: 0,
            message: other.to_string(),
        },
    }
}

/// Longest line the client buffers while waiting for its newline.
pub(crate) const MAX_LINE_LEN: usize = 1024 * 1024;

/// Receive buffer that yields complete newline-terminated lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Remove and return the next complete line without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Bytes of an incomplete trailing line.
    pub(crate) fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop an incomplete line that has grown past [`MAX_LINE_LEN`].
    /// Returns the number of bytes dropped.
    ///
    /// The rest of that line, up to its newline, later comes out as a
    /// fragment that fails to parse and is discarded like any other
    /// malformed line.
    pub(crate) fn discard_oversized(&mut self) -> Option<usize> {
        if self.buf.len() <= MAX_LINE_LEN {
            return None;
        }
        let dropped = self.buf.len();
        self.buf.clear();
        Some(dropped)
    }
}
