//! Leaderboard rows and the inputs that create them.

use chrono::{DateTime, Utc};
use memomatch_game::{BASE_SCORE, Difficulty, RoundOutcome, checked_name};
use serde::{Deserialize, Serialize};

use crate::ScoreError;

// ---------------------------------------------------------------------------
// ScoreEntry
// ---------------------------------------------------------------------------

/// One row of the leaderboard, as returned by
/// [`ScoreStore::top_scores`](crate::ScoreStore::top_scores).
///
/// The elapsed time travels as `time_taken`, the column name used by the
/// `game_scores` table and the browser client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player_name: String,
    pub score: i64,
    pub difficulty: Difficulty,
    #[serde(rename = "time_taken")]
    pub elapsed_secs: u64,
}

impl ScoreEntry {
    /// Copy of this entry with the player name masked for public display.
    pub fn masked(&self) -> Self {
        Self {
            player_name: mask_player_name(&self.player_name),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// NewScore
// ---------------------------------------------------------------------------

/// A score ready to be written to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScore {
    pub player_name: String,
    pub score: i64,
    pub difficulty: Difficulty,
    pub elapsed_secs: u64,
    pub recorded_at: DateTime<Utc>,
}

impl NewScore {
    /// Builds a score from a finished round. The elapsed time comes from
    /// the server's own clock, not from the client.
    pub fn from_outcome(outcome: &RoundOutcome, recorded_at: DateTime<Utc>) -> Self {
        Self {
            player_name: outcome.player_name.clone(),
            score: outcome.score,
            difficulty: outcome.difficulty,
            elapsed_secs: outcome.elapsed_secs,
            recorded_at,
        }
    }

    /// The leaderboard row this score will show up as.
    pub fn entry(&self) -> ScoreEntry {
        ScoreEntry {
            player_name: self.player_name.clone(),
            score: self.score,
            difficulty: self.difficulty,
            elapsed_secs: self.elapsed_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// ScoreSubmission
// ---------------------------------------------------------------------------

/// A score reported by a client rather than computed by the server.
///
/// All four fields are required; serde rejects a payload missing any of
/// them. `difficulty` stays a string here so an unknown value surfaces as
/// a [`ScoreError::Validation`] instead of a decode error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub player_name: String,
    pub score: i64,
    pub difficulty: String,
    pub time_taken: u64,
}

impl ScoreSubmission {
    /// Checks the submission and turns it into a [`NewScore`].
    ///
    /// # Errors
    /// [`ScoreError::Validation`] when the name is empty or too long, the
    /// difficulty is unknown, or the score is negative or above
    /// [`max_submitted_score`] for the difficulty.
    pub fn validate(self, recorded_at: DateTime<Utc>) -> Result<NewScore, ScoreError> {
        let player_name = checked_name(&self.player_name)
            .map_err(|e| ScoreError::Validation(format!("player_name: {e}")))?;

        let difficulty: Difficulty = self
            .difficulty
            .parse()
            .map_err(|e| ScoreError::Validation(format!("{e}")))?;

        let max = max_submitted_score(difficulty);
        if !(0..=max).contains(&self.score) {
            return Err(ScoreError::Validation(format!(
                "score {} is outside 0..={max} for {difficulty}",
                self.score
            )));
        }

        Ok(NewScore {
            player_name,
            score: self.score,
            difficulty,
            elapsed_secs: self.time_taken,
            recorded_at,
        })
    }
}

/// Highest score a browser client can report for a round.
///
/// The browser scores a normal round at one and a half times an easy one
/// and never goes below zero.
pub fn max_submitted_score(difficulty: Difficulty) -> i64 {
    match difficulty {
        Difficulty::Easy => BASE_SCORE,
        Difficulty::Normal => BASE_SCORE * 3 / 2,
    }
}

// ---------------------------------------------------------------------------
// Name masking
// ---------------------------------------------------------------------------

/// Masks a player name for the public leaderboard: the first character is
/// kept, every other character becomes `*`. One-character names are shown
/// as-is.
///
/// ```rust
/// use memomatch_scores::mask_player_name;
///
/// assert_eq!(mask_player_name("alice"), "a****");
/// assert_eq!(mask_player_name("z"), "z");
/// ```
pub fn mask_player_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.count();
            let mut masked = String::with_capacity(first.len_utf8() + rest);
            masked.push(first);
            masked.extend(std::iter::repeat_n('*', rest));
            masked
        }
        None => String::new(),
    }
}
