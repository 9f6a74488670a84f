//! Message types for Memomatch's wire format.
//!
//! Everything a browser client and the server say to each other is one of
//! these types, serialized as JSON. The shapes are internally tagged
//! (`{"type": "FlipCard", "index": 3}`) so a JavaScript client can switch
//! on `msg.type` without unwrapping nested objects.

use memomatch_game::{CardFace, FlipStatus};
use memomatch_scores::{ScoreEntry, ScoreSubmission};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SystemMessage — connection plumbing
// ---------------------------------------------------------------------------

/// Messages that manage the connection itself rather than the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server: first message on every connection.
    Handshake { version: u32 },

    /// Server → Client: handshake accepted. `server_time` is milliseconds
    /// since the connection was accepted.
    HandshakeAck { connection_id: u64, server_time: u64 },

    /// Either direction: the sender is closing the connection.
    Disconnect { reason: String },

    /// Client → Server: keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client: echoes `client_time` for round-trip measurement.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Server → Client: a request was rejected. `code` follows HTTP
    /// conventions, see [`codes`](crate::codes).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// GameMessage — the matching game and the leaderboard
// ---------------------------------------------------------------------------

/// Game and leaderboard messages, in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameMessage {
    // -- Client → Server --

    /// Deal a new board. `difficulty` is `"easy"` or `"normal"`; it stays
    /// a string on the wire so an unknown value is reported as an invalid
    /// difficulty rather than a decode failure.
    StartGame {
        player_name: String,
        difficulty: String,
    },

    /// Flip the card at `index` (zero-based).
    FlipCard { index: usize },

    /// Finish the round. `success: false` abandons it with a score of 0.
    EndGame { success: bool },

    /// Ask for the leaderboard. `limit` defaults to 10.
    GetScores {
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Report a score computed by the client. Only honored when the
    /// server is configured to accept client scores.
    SubmitScore(ScoreSubmission),

    // -- Server → Client --

    /// A board was dealt. Faces stay hidden until flipped.
    GameStarted {
        player_name: String,
        difficulty: String,
        pair_count: usize,
        board_len: usize,
        time_limit_secs: u64,
    },

    /// Result of a `FlipCard`: the face under `index` and what happened.
    CardFlipped {
        index: usize,
        face: CardFace,
        status: FlipStatus,
    },

    /// The round is over. `recorded` is `false` when the score could not
    /// be stored; the score itself still stands.
    GameEnded {
        success: bool,
        score: i64,
        elapsed_secs: u64,
        timed_out: bool,
        recorded: bool,
    },

    /// Leaderboard rows, best first, with player names masked.
    Scores { entries: Vec<ScoreEntry> },

    /// A `SubmitScore` was stored.
    ScoreAccepted,
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged: `{"type": "Game", "data": {"type": "FlipCard", ...}}`.
/// The outer tag tells the handler whether it is connection plumbing or
/// game traffic before it looks any further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    Game(GameMessage),
}

/// Every message on the wire is an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the connection was accepted (server) or any
    /// client-chosen origin (client). Informational only.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    pub fn system(seq: u64, timestamp: u64, msg: SystemMessage) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::System(msg),
        }
    }

    pub fn game(seq: u64, timestamp: u64, msg: GameMessage) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Game(msg),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
