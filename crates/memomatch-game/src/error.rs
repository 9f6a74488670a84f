//! Error types for the game layer.
//!
//! Every variant is a contract violation by the caller (a UI bug, a stale
//! client, a malformed request). None of them are transient, so nothing in
//! this crate retries: the error goes straight back to whoever called.

/// Errors returned by [`GameSession`](crate::GameSession) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// `flip_card` was called with an index outside the board.
    #[error("card index {index} is out of range for a board of {len} cards")]
    InvalidIndex { index: usize, len: usize },

    /// A difficulty string was neither `easy` nor `normal`.
    #[error("unknown difficulty: {0:?}")]
    InvalidDifficulty(String),

    /// The player name was empty after trimming, or longer than
    /// [`MAX_NAME_CHARS`](crate::MAX_NAME_CHARS).
    #[error("player name must be 1 to {} characters", crate::MAX_NAME_CHARS)]
    InvalidPlayerName,

    /// A caller-supplied board layout breaks the pairing rules.
    #[error("invalid board layout: {0}")]
    InvalidBoard(String),

    /// `flip_card` or `end_game` was called before `start`.
    #[error("game session has not been started")]
    SessionNotStarted,

    /// Any mutating call after `end_game`. A finished session is not
    /// reusable; create a new one for another round.
    #[error("game session has already ended")]
    SessionAlreadyEnded,
}
