//! Error types for the score store layer.

/// Errors from recording or reading leaderboard scores.
///
/// A failed write never affects the round that produced the score: callers
/// log it and carry on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    /// A submitted score failed validation (missing name, unknown
    /// difficulty, impossible score).
    #[error("invalid score: {0}")]
    Validation(String),

    /// The backing store could not be reached.
    #[error("score store unavailable: {0}")]
    Unavailable(String),

    /// The backing store answered with an error or an unreadable response.
    #[error("score store error: {0}")]
    Backend(String),
}
