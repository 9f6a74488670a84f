//! HTTP-style status codes carried by [`SystemMessage::Error`](crate::SystemMessage::Error).
//!
//! Each failure the server reports maps to one code, so a client can tell a
//! bug on its side (4xx) from a problem with the score store (5xx).

use memomatch_game::GameError;
use memomatch_scores::ScoreError;

/// Malformed message or invalid argument (bad index, unknown difficulty).
pub const BAD_REQUEST: u16 = 400;

/// The request is valid but not allowed by server configuration.
pub const FORBIDDEN: u16 = 403;

/// The request does not fit the round's current state.
pub const CONFLICT: u16 = 409;

/// Unexpected server-side failure.
pub const INTERNAL: u16 = 500;

/// The score store failed.
pub const BAD_GATEWAY: u16 = 502;

/// Code reported for a game rule violation.
pub fn for_game_error(err: &GameError) -> u16 {
    match err {
        GameError::InvalidIndex { .. }
        | GameError::InvalidDifficulty(_)
        | GameError::InvalidPlayerName
        | GameError::InvalidBoard(_) => BAD_REQUEST,
        GameError::SessionNotStarted | GameError::SessionAlreadyEnded => CONFLICT,
    }
}

/// Code reported for a score store failure.
pub fn for_score_error(err: &ScoreError) -> u16 {
    match err {
        ScoreError::Validation(_) => BAD_REQUEST,
        ScoreError::Unavailable(_) | ScoreError::Backend(_) => BAD_GATEWAY,
    }
}
