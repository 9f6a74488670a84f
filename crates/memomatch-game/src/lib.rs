//! Card-matching game logic for Memomatch.
//!
//! This crate models a single player's round: a shuffled board of paired
//! cards, flipping cards two at a time, and scoring the round by how long
//! it took. It knows nothing about networking or storage.
//!
//! # Key types
//!
//! - [`GameSession`] — one round, from `start` to `end_game`
//! - [`Difficulty`] — easy (6 pairs) or normal (10 pairs)
//! - [`FlipStatus`] — result of flipping a card
//! - [`RoundOutcome`] — score and timing of a finished round
//! - [`Clock`] — injectable time source ([`SystemClock`], [`ManualClock`])
//!
//! # Example
//!
//! ```rust
//! use memomatch_game::{CardFace, Difficulty, FlipStatus, GameSession, ManualClock};
//!
//! let board = vec![CardFace(1), CardFace(2), CardFace(1), CardFace(2)];
//! let mut session =
//!     GameSession::with_layout("alice", Difficulty::Easy, board, ManualClock::new())
//!         .unwrap();
//!
//! assert_eq!(session.flip_card(0).unwrap(), FlipStatus::Flipped);
//! assert_eq!(session.flip_card(2).unwrap(), FlipStatus::Continue);
//! assert_eq!(session.flip_card(1).unwrap(), FlipStatus::Flipped);
//! assert_eq!(session.flip_card(3).unwrap(), FlipStatus::Completed);
//!
//! let outcome = session.end_game(true).unwrap();
//! assert_eq!(outcome.score, 1000);
//! ```

mod board;
mod clock;
mod error;
mod session;

pub use board::{CardFace, Difficulty, shuffled_board, validate_layout};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GameError;
pub use session::{
    BASE_SCORE, DEFAULT_TIME_LIMIT, FlipStatus, GameSession, MAX_NAME_CHARS,
    PENALTY_PER_SECOND, RoundOutcome, SessionState, checked_name, score_for,
};
