//! # Memomatch
//!
//! Server for a single-player memory-matching card game with a shared
//! leaderboard.
//!
//! Each browser connects over WebSocket, starts a round, and flips cards
//! two at a time. The server owns the board, the timer and the score, and
//! records every finished round in a [`ScoreStore`](memomatch_scores::ScoreStore).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memomatch::prelude::*;
//!
//! # async fn start() -> Result<(), MemomatchError> {
//! let server = MemomatchServerBuilder::new()
//!     .config(ServerConfig::from_env()?)
//!     .build(MemoryScoreStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod handler;
mod server;
pub mod transport;

pub use config::{ConfigError, ServerConfig};
pub use error::MemomatchError;
pub use server::{MemomatchServer, MemomatchServerBuilder};
pub use transport::{Connection, ConnectionId, TransportError, WebSocketTransport};

/// The types most servers need.
pub mod prelude {
    pub use crate::{
        ConfigError, MemomatchError, MemomatchServer, MemomatchServerBuilder, ServerConfig,
    };
    pub use memomatch_game::{Difficulty, FlipStatus, GameSession};
    pub use memomatch_protocol::{Envelope, GameMessage, Payload, SystemMessage};
    pub use memomatch_scores::{MemoryScoreStore, ScoreEntry, ScoreStore};
    #[cfg(feature = "supabase")]
    pub use memomatch_scores::{SupabaseConfig, SupabaseScoreStore};
}
