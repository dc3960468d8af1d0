//! Error types for the protocol layer.

/// Errors that can occur while parsing a handshake or a frame.
///
/// None of these are ever reported back to the client. The connection
/// handler logs them and drops the offending frame (or refuses the
/// handshake).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name,
    /// or a `data` field that is not an object.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A required handshake parameter is absent or empty.
    #[error("missing required parameter `{0}`")]
    MissingParam(&'static str),

    /// The handshake query string could not be parsed.
    #[error("invalid handshake query: {0}")]
    InvalidQuery(String),
}
