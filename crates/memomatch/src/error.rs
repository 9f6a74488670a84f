//! Unified error type for the Memomatch server.

use memomatch_game::GameError;
use memomatch_protocol::ProtocolError;
use memomatch_scores::ScoreError;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// `#[from]` on each variant lets `?` lift sub-crate errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum MemomatchError {
    /// Connection-level failure (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode/decode failure or handshake violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A game rule was violated.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The score store failed.
    #[error(transparent)]
    Score(#[from] ScoreError),

    /// The server configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
