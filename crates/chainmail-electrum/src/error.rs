//! Error types for indexing-server calls.

/// Errors that can occur when talking to an indexing server.
#[derive(Debug, thiserror::Error)]
pub enum ElectrumError {
    /// Socket-level failure before any response was possible.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// TLS setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered with an explicit error object.
    #[error("server error ({code}): {message}")]
    Rpc {
        /// Error code reported by the server (0 when none was given).
        code: i64,
        /// Error message, verbatim from the server.
        message: String,
    },

    /// The connection went away while the call was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// Failed to serialize a request.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The `result` of a call did not have the expected shape.
    #[error("unexpected result for {method}: {source}")]
    InvalidResponse {
        /// The method whose result failed to decode.
        method: String,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },
}
