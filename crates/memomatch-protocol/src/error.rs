//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating messages.
///
/// A `ProtocolError` always means the bytes or their framing were wrong.
/// Game rule violations are [`GameError`](memomatch_game::GameError)s and
/// never show up here.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A value could not be turned into bytes.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Incoming bytes were not valid JSON or did not match any message
    /// shape (unknown `type`, missing field, wrong field type).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The client speaks a different protocol version.
    #[error("unsupported protocol version: expected {expected}, got {got}")]
    UnsupportedVersion { expected: u32, got: u32 },

    /// The message decoded fine but is not allowed here, e.g. a game
    /// message before the handshake.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
