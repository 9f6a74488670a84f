//! The game session: one player's round of card matching.
//!
//! A session owns the board and everything that changes while the player
//! flips cards. It is plain synchronous data with no locking: each round is
//! owned by exactly one caller (the server gives every connection its own
//! session), so there is nothing to coordinate.
//!
//! ```text
//!              start()            end_game()
//! NotStarted ──────────→ InProgress ──────────→ Ended
//!                         │    ↑
//!                         └────┘ flip_card()
//! ```

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{shuffled_board, validate_layout};
use crate::{CardFace, Clock, Difficulty, GameError, SystemClock};

/// Countdown budget for a round. The session only reports it; enforcing it
/// (ending the round with `success = false`) is the caller's job.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(50);

/// Longest accepted player name, counted in characters after trimming.
pub const MAX_NAME_CHARS: usize = 32;

/// Score for a round finished in zero seconds.
pub const BASE_SCORE: i64 = 1000;

/// Points lost per whole second of play.
pub const PENALTY_PER_SECOND: i64 = 2;

// ---------------------------------------------------------------------------
// SessionState / FlipStatus / RoundOutcome
// ---------------------------------------------------------------------------

/// Lifecycle of a [`GameSession`]. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Ended,
}

/// What happened when a card was flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipStatus {
    /// One card is face-up, waiting for its partner.
    Flipped,
    /// The card is already face-up and unresolved. Nothing changed.
    AlreadyFlipped,
    /// The card belongs to a pair that was already matched. Nothing changed.
    AlreadyMatched,
    /// Two cards were compared (match or not) and pairs remain.
    Continue,
    /// The last pair was just matched.
    Completed,
}

/// The result of [`GameSession::end_game`].
///
/// This is everything a score store needs to record a leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub player_name: String,
    pub difficulty: Difficulty,
    pub success: bool,
    pub score: i64,
    /// Whole seconds between `start` and `end_game` (truncated).
    pub elapsed_secs: u64,
}

/// Computes a round's score.
///
/// A failed round scores 0. A successful one scores
/// `1000 - 2 * elapsed_secs`. The result is deliberately not clamped, so a
/// very slow completion yields a negative score.
pub fn score_for(success: bool, elapsed_secs: u64) -> i64 {
    if !success {
        return 0;
    }
    let elapsed = i64::try_from(elapsed_secs).unwrap_or(i64::MAX / 2);
    BASE_SCORE - PENALTY_PER_SECOND * elapsed
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One player's round of the matching game.
///
/// Generic over the [`Clock`] so tests can control elapsed time. The
/// default, [`SystemClock`], reads the real monotonic clock.
#[derive(Debug)]
pub struct GameSession<C: Clock = SystemClock> {
    clock: C,
    state: SessionState,
    board: Vec<CardFace>,
    pair_count: usize,
    /// Faces whose pair has been found. Only ever grows.
    matched: BTreeSet<CardFace>,
    /// Face-up, unresolved card indices, in flip order. At most 2.
    selected: Vec<usize>,
    difficulty: Difficulty,
    player_name: String,
    started_at: Option<Instant>,
    time_limit: Duration,
}

impl GameSession<SystemClock> {
    /// Creates an unstarted session on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for GameSession<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> GameSession<C> {
    /// Creates an unstarted session that reads time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            state: SessionState::NotStarted,
            board: Vec::new(),
            pair_count: 0,
            matched: BTreeSet::new(),
            selected: Vec::with_capacity(2),
            difficulty: Difficulty::Normal,
            player_name: String::new(),
            started_at: None,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }

    /// Overrides the advisory time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Creates a session that is already in progress on a fixed board.
    ///
    /// The pair-count is `board.len() / 2`, regardless of `difficulty`.
    /// Useful for tests and for replaying a known layout.
    ///
    /// # Errors
    /// - [`GameError::InvalidPlayerName`] for an empty or over-long name
    /// - [`GameError::InvalidBoard`] if any face does not occur exactly twice
    pub fn with_layout(
        player_name: impl Into<String>,
        difficulty: Difficulty,
        board: Vec<CardFace>,
        clock: C,
    ) -> Result<Self, GameError> {
        let player_name = checked_name(&player_name.into())?;
        let pair_count = validate_layout(&board)?;

        let mut session = Self::with_clock(clock);
        session.begin(player_name, difficulty, board, pair_count);
        Ok(session)
    }

    /// Starts (or restarts) a round with a freshly shuffled board.
    ///
    /// Calling `start` on a session that is already in progress throws the
    /// current round away and deals a new one.
    ///
    /// # Errors
    /// - [`GameError::SessionAlreadyEnded`] after `end_game`
    /// - [`GameError::InvalidPlayerName`] for an empty or over-long name
    pub fn start(
        &mut self,
        player_name: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<(), GameError> {
        self.start_with_rng(player_name, difficulty, &mut rand::rng())
    }

    /// Same as [`start`](Self::start), shuffling with the given RNG.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        player_name: impl Into<String>,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Result<(), GameError> {
        if self.state == SessionState::Ended {
            return Err(GameError::SessionAlreadyEnded);
        }
        let player_name = checked_name(&player_name.into())?;

        let pair_count = difficulty.pair_count();
        let board = shuffled_board(pair_count, rng)?;
        self.begin(player_name, difficulty, board, pair_count);
        Ok(())
    }

    fn begin(
        &mut self,
        player_name: String,
        difficulty: Difficulty,
        board: Vec<CardFace>,
        pair_count: usize,
    ) {
        self.player_name = player_name;
        self.difficulty = difficulty;
        self.board = board;
        self.pair_count = pair_count;
        self.matched.clear();
        self.selected.clear();
        self.started_at = Some(self.clock.now());
        self.state = SessionState::InProgress;

        tracing::debug!(
            player = %self.player_name,
            %difficulty,
            pairs = pair_count,
            "game session started"
        );
    }

    /// Flips the card at `index` face-up.
    ///
    /// When this is the second face-up card, the pair is resolved right
    /// away: a match is recorded, a mismatch turns both cards back down.
    /// Either way `selected` is empty again afterwards.
    ///
    /// Flipping a card whose pair is already matched is a no-op reported as
    /// [`FlipStatus::AlreadyMatched`], rather than selecting it again.
    ///
    /// # Errors
    /// - [`GameError::SessionNotStarted`] / [`GameError::SessionAlreadyEnded`]
    /// - [`GameError::InvalidIndex`] if `index` is off the board
    pub fn flip_card(&mut self, index: usize) -> Result<FlipStatus, GameError> {
        self.ensure_in_progress()?;

        let face = *self.board.get(index).ok_or(GameError::InvalidIndex {
            index,
            len: self.board.len(),
        })?;

        if self.selected.contains(&index) {
            return Ok(FlipStatus::AlreadyFlipped);
        }
        if self.matched.contains(&face) {
            return Ok(FlipStatus::AlreadyMatched);
        }

        self.selected.push(index);
        if self.selected.len() == 2 {
            return Ok(self.resolve_selection());
        }
        Ok(FlipStatus::Flipped)
    }

    /// Compares the two selected cards and clears the selection.
    fn resolve_selection(&mut self) -> FlipStatus {
        let (first, second) = (self.selected[0], self.selected[1]);
        self.selected.clear();

        let face = self.board[first];
        if face != self.board[second] {
            return FlipStatus::Continue;
        }

        self.matched.insert(face);
        tracing::trace!(%face, matched = self.matched.len(), "pair matched");

        if self.matched.len() == self.pair_count {
            FlipStatus::Completed
        } else {
            FlipStatus::Continue
        }
    }

    /// Ends the round and computes its score.
    ///
    /// `success` says whether the player matched every pair (`true`) or the
    /// round was abandoned or timed out (`false`). The session is finished
    /// afterwards; recording the outcome somewhere is up to the caller.
    ///
    /// # Errors
    /// - [`GameError::SessionNotStarted`] / [`GameError::SessionAlreadyEnded`]
    pub fn end_game(&mut self, success: bool) -> Result<RoundOutcome, GameError> {
        self.ensure_in_progress()?;

        let elapsed_secs = self.elapsed().as_secs();
        let score = score_for(success, elapsed_secs);
        self.state = SessionState::Ended;

        tracing::info!(
            player = %self.player_name,
            difficulty = %self.difficulty,
            success,
            score,
            elapsed_secs,
            "game session ended"
        );

        Ok(RoundOutcome {
            player_name: self.player_name.clone(),
            difficulty: self.difficulty,
            success,
            score,
            elapsed_secs,
        })
    }

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        match self.state {
            SessionState::NotStarted => Err(GameError::SessionNotStarted),
            SessionState::InProgress => Ok(()),
            SessionState::Ended => Err(GameError::SessionAlreadyEnded),
        }
    }

    // -- Queries ----------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn board(&self) -> &[CardFace] {
        &self.board
    }

    /// Face of the card at `index`, or `None` if it is off the board.
    pub fn face_at(&self, index: usize) -> Option<CardFace> {
        self.board.get(index).copied()
    }

    pub fn matched(&self) -> &BTreeSet<CardFace> {
        &self.matched
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// `true` once every pair has been matched.
    pub fn is_complete(&self) -> bool {
        self.pair_count > 0 && self.matched.len() == self.pair_count
    }

    /// Time since `start`. Zero before the session starts.
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(at) => self.clock.now().saturating_duration_since(at),
            None => Duration::ZERO,
        }
    }

    /// Time left before the advisory limit runs out.
    pub fn remaining_time(&self) -> Duration {
        self.time_limit.saturating_sub(self.elapsed())
    }

    /// `true` when a round in progress has used up its time limit.
    pub fn is_time_up(&self) -> bool {
        self.state == SessionState::InProgress && self.elapsed() >= self.time_limit
    }
}

/// Trims `name` and checks it is 1 to [`MAX_NAME_CHARS`] characters long.
///
/// Every name that can reach the leaderboard goes through this, whether it
/// comes from a played round or a client-submitted score.
pub fn checked_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::InvalidPlayerName);
    }
    Ok(name.to_string())
}

// =========================================================================
// Tests
// =========================================================================
