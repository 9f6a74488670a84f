//! Leaderboard storage for Memomatch.
//!
//! The game server records one entry per finished round and serves the
//! top scores back to clients. Where those entries live is hidden behind
//! the [`ScoreStore`] trait so the server can be handed any backend.
//!
//! # Key types
//!
//! - [`ScoreStore`] — record a score, read the top N
//! - [`MemoryScoreStore`] — in-process store for development and tests
//! - [`SupabaseScoreStore`] — Supabase REST store (feature `supabase`)
//! - [`ScoreSubmission`] — validated client-reported score payload
//!
//! # Feature Flags
//!
//! - `supabase` (default) — [`SupabaseScoreStore`] via `reqwest`

mod entry;
mod error;
mod store;
#[cfg(feature = "supabase")]
mod supabase;

pub use entry::{
    NewScore, ScoreEntry, ScoreSubmission, mask_player_name, max_submitted_score,
};
pub use memomatch_game::MAX_NAME_CHARS;
pub use error::ScoreError;
pub use store::{
    DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT, MemoryScoreStore,
    ScoreStore, clamp_limit,
};
#[cfg(feature = "supabase")]
pub use supabase::{DEFAULT_TABLE, SupabaseConfig, SupabaseScoreStore};
