//! Per-connection handler: handshake, then the game and leaderboard loop.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! and that task owns the player's [`GameSession`] outright. Nothing about
//! a round is shared between connections; only the score store is.
//!
//! The flow is:
//!   1. Receive Handshake → check version → send HandshakeAck
//!   2. Loop: receive envelopes → dispatch system or game messages
//!   3. While a round is running, the receive wait is the round's
//!      remaining time, not the idle timeout, so an expired round ends on
//!      its own and is recorded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use memomatch_game::{Difficulty, FlipStatus, GameError, GameSession, SessionState};
use memomatch_protocol::{
    Codec, Envelope, GameMessage, PROTOCOL_VERSION, Payload, ProtocolError, SystemMessage,
    codes,
};
use memomatch_scores::{
    DEFAULT_LEADERBOARD_LIMIT, NewScore, ScoreError, ScoreStore, ScoreSubmission,
};

use crate::server::ServerState;
use crate::transport::Connection;
use crate::MemomatchError;

/// Outgoing side of one connection: the connection, the codec, and the
/// per-connection sequence counter.
struct Peer<'a, C: Connection, K: Codec> {
    conn: &'a C,
    codec: &'a K,
    seq: u64,
    accepted_at: Instant,
}

impl<C: Connection, K: Codec> Peer<'_, C, K> {
    fn millis(&self) -> u64 {
        self.accepted_at.elapsed().as_millis() as u64
    }

    async fn send(&mut self, payload: Payload) -> Result<(), MemomatchError> {
        let envelope = Envelope {
            seq: self.seq,
            timestamp: self.millis(),
            payload,
        };
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_game(&mut self, msg: GameMessage) -> Result<(), MemomatchError> {
        self.send(Payload::Game(msg)).await
    }

    async fn send_error(
        &mut self,
        code: u16,
        message: impl Into<String>,
    ) -> Result<(), MemomatchError> {
        self.send(Payload::System(SystemMessage::Error {
            code,
            message: message.into(),
        }))
        .await
    }
}

/// The round currently attached to a connection, if any.
type Round = Option<GameSession>;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, S, K>(
    conn: C,
    state: Arc<ServerState<S, K>>,
) -> Result<(), MemomatchError>
where
    C: Connection,
    S: ScoreStore,
    K: Codec,
{
    let conn_id = conn.id();
    let mut peer = Peer {
        conn: &conn,
        codec: &state.codec,
        seq: 0,
        accepted_at: Instant::now(),
    };

    perform_handshake(&mut peer, &state).await?;
    tracing::info!(%conn_id, "client connected");

    let mut round: Round = None;

    loop {
        let wait = next_wait(&round, state.config.idle_timeout);
        let data = match tokio::time::timeout(wait, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                if round.as_ref().is_some_and(GameSession::is_time_up) {
                    expire_round(&mut peer, &state, &mut round).await?;
                    continue;
                }
                if round.as_ref().is_some_and(|s| s.state() == SessionState::InProgress) {
                    // Woke up for the round deadline, which has not quite passed.
                    continue;
                }
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                peer.send_error(codes::BAD_REQUEST, e.to_string()).await?;
                continue;
            }
        };

        match envelope.payload {
            Payload::System(msg) => {
                if handle_system_message(&mut peer, msg).await? {
                    break;
                }
            }
            Payload::Game(msg) => {
                handle_game_message(&mut peer, &state, &mut round, msg).await?;
            }
        }
    }

    if let Some(session) = &round {
        if session.state() == SessionState::InProgress {
            tracing::info!(
                %conn_id,
                player = %session.player_name(),
                "round abandoned by disconnect"
            );
        }
    }
    let _ = conn.close().await;
    Ok(())
}

/// How long to wait for the next message.
///
/// A running round waits for its own deadline instead of the idle timeout,
/// so a silent player still gets the round ended and recorded.
fn next_wait(round: &Round, idle_timeout: Duration) -> Duration {
    match round {
        Some(session) if session.state() == SessionState::InProgress => {
            session.remaining_time()
        }
        _ => idle_timeout,
    }
}

/// Receives the handshake, checks the version, and acknowledges it.
async fn perform_handshake<C, S, K>(
    peer: &mut Peer<'_, C, K>,
    state: &ServerState<S, K>,
) -> Result<(), MemomatchError>
where
    C: Connection,
    S: ScoreStore,
    K: Codec,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout, peer.conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = match state.codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            peer.send_error(codes::BAD_REQUEST, e.to_string()).await?;
            return Err(e.into());
        }
    };

    let version = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version }) => version,
        _ => {
            peer.send_error(codes::BAD_REQUEST, "expected Handshake").await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        let err = ProtocolError::UnsupportedVersion {
            expected: PROTOCOL_VERSION,
            got: version,
        };
        peer.send_error(codes::BAD_REQUEST, err.to_string()).await?;
        return Err(err.into());
    }

    let ack = SystemMessage::HandshakeAck {
        connection_id: peer.conn.id().into_inner(),
        server_time: peer.millis(),
    };
    peer.send(Payload::System(ack)).await
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<C, K>(
    peer: &mut Peer<'_, C, K>,
    msg: SystemMessage,
) -> Result<bool, MemomatchError>
where
    C: Connection,
    K: Codec,
{
    let conn_id = peer.conn.id();
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            let ack = SystemMessage::HeartbeatAck {
                client_time,
                server_time: peer.millis(),
            };
            peer.send(Payload::System(ack)).await?;
        }
        SystemMessage::Disconnect { reason } => {
            tracing::info!(%conn_id, %reason, "client disconnected");
            return Ok(true);
        }
        SystemMessage::Handshake { .. } => {
            peer.send_error(codes::CONFLICT, "handshake already completed").await?;
        }
        _ => {
            tracing::debug!(%conn_id, "ignoring unexpected system message");
        }
    }
    Ok(false)
}

/// Handles a game or leaderboard message.
///
/// Rule violations are answered with an `Error` message and do not close
/// the connection; only transport and encoding failures propagate.
async fn handle_game_message<C, S, K>(
    peer: &mut Peer<'_, C, K>,
    state: &ServerState<S, K>,
    round: &mut Round,
    msg: GameMessage,
) -> Result<(), MemomatchError>
where
    C: Connection,
    S: ScoreStore,
    K: Codec,
{
    match msg {
        GameMessage::StartGame {
            player_name,
            difficulty,
        } => {
            if let Err(e) = start_round(peer, state, round, player_name, &difficulty).await? {
                peer.send_error(codes::for_game_error(&e), e.to_string()).await?;
            }
        }

        GameMessage::FlipCard { index } => {
            if round.as_ref().is_some_and(GameSession::is_time_up) {
                return expire_round(peer, state, round).await;
            }
            match flip(round, index) {
                Ok((face, status)) => {
                    peer.send_game(GameMessage::CardFlipped { index, face, status })
                        .await?;
                    if status == FlipStatus::Completed {
                        finish_round(peer, state, round, true, false).await?;
                    }
                }
                Err(e) => {
                    peer.send_error(codes::for_game_error(&e), e.to_string()).await?;
                }
            }
        }

        GameMessage::EndGame { success } => {
            // Completing the board ends the round automatically, so a
            // round still in progress here was not completed.
            if success {
                tracing::warn!(
                    conn_id = %peer.conn.id(),
                    "client claimed success for an unfinished round"
                );
            }
            let timed_out = round.as_ref().is_some_and(GameSession::is_time_up);
            finish_round(peer, state, round, false, timed_out).await?;
        }

        GameMessage::GetScores { limit } => {
            let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
            match state.store.top_scores(limit).await {
                Ok(entries) => {
                    let entries = entries.iter().map(|e| e.masked()).collect();
                    peer.send_game(GameMessage::Scores { entries }).await?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "leaderboard read failed");
                    peer.send_error(codes::for_score_error(&e), e.to_string()).await?;
                }
            }
        }

        GameMessage::SubmitScore(submission) => {
            if !state.config.accept_client_scores {
                peer.send_error(codes::FORBIDDEN, "client-reported scores are disabled")
                    .await?;
                return Ok(());
            }
            match submit_score(&state.store, submission).await {
                Ok(()) => peer.send_game(GameMessage::ScoreAccepted).await?,
                Err(e) => {
                    peer.send_error(codes::for_score_error(&e), e.to_string()).await?;
                }
            }
        }

        GameMessage::GameStarted { .. }
        | GameMessage::CardFlipped { .. }
        | GameMessage::GameEnded { .. }
        | GameMessage::Scores { .. }
        | GameMessage::ScoreAccepted => {
            peer.send_error(codes::BAD_REQUEST, "server-only message sent by client")
                .await?;
        }
    }
    Ok(())
}

/// Deals a new board. The outer `Result` carries transport failures, the
/// inner one game rule violations to report back to the client.
async fn start_round<C, S, K>(
    peer: &mut Peer<'_, C, K>,
    state: &ServerState<S, K>,
    round: &mut Round,
    player_name: String,
    difficulty: &str,
) -> Result<Result<(), GameError>, MemomatchError>
where
    C: Connection,
    S: ScoreStore,
    K: Codec,
{
    let difficulty: Difficulty = match difficulty.parse() {
        Ok(d) => d,
        Err(e) => return Ok(Err(e)),
    };

    // A finished session is not reusable; anything else is restarted.
    if round.as_ref().is_some_and(|s| s.state() == SessionState::Ended) {
        *round = None;
    }
    let session =
        round.get_or_insert_with(|| GameSession::new().with_time_limit(state.config.time_limit));
    if let Err(e) = session.start(player_name, difficulty) {
        return Ok(Err(e));
    }

    let started = GameMessage::GameStarted {
        player_name: session.player_name().to_string(),
        difficulty: difficulty.to_string(),
        pair_count: session.pair_count(),
        board_len: session.board().len(),
        time_limit_secs: session.time_limit().as_secs(),
    };
    peer.send_game(started).await?;
    Ok(Ok(()))
}

fn flip(
    round: &mut Round,
    index: usize,
) -> Result<(memomatch_game::CardFace, FlipStatus), GameError> {
    let session = round.as_mut().ok_or(GameError::SessionNotStarted)?;
    let status = session.flip_card(index)?;
    // `flip_card` already rejected out-of-range indices.
    let face = session
        .face_at(index)
        .ok_or(GameError::InvalidIndex { index, len: session.board().len() })?;
    Ok((face, status))
}

/// Ends a round that ran out of time.
async fn expire_round<C, S, K>(
    peer: &mut Peer<'_, C, K>,
    state: &ServerState<S, K>,
    round: &mut Round,
) -> Result<(), MemomatchError>
where
    C: Connection,
    S: ScoreStore,
    K: Codec,
{
    tracing::info!(conn_id = %peer.conn.id(), "round time limit reached");
    finish_round(peer, state, round, false, true).await
}

/// Ends the round, records its score, and tells the client.
///
/// A store failure is logged and reported as `recorded: false`; it never
/// changes the outcome of the round.
async fn finish_round<C, S, K>(
    peer: &mut Peer<'_, C, K>,
    state: &ServerState<S, K>,
    round: &mut Round,
    success: bool,
    timed_out: bool,
) -> Result<(), MemomatchError>
where
    C: Connection,
    S: ScoreStore,
    K: Codec,
{
    let outcome = match round.as_mut().ok_or(GameError::SessionNotStarted) {
        Ok(session) => session.end_game(success),
        Err(e) => Err(e),
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            return peer.send_error(codes::for_game_error(&e), e.to_string()).await;
        }
    };

    let recorded = match state
        .store
        .record_score(NewScore::from_outcome(&outcome, Utc::now()))
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                player = %outcome.player_name,
                score = outcome.score,
                error = %e,
                "failed to record score"
            );
            false
        }
    };

    peer.send_game(GameMessage::GameEnded {
        success: outcome.success,
        score: outcome.score,
        elapsed_secs: outcome.elapsed_secs,
        timed_out,
        recorded,
    })
    .await
}

async fn submit_score<S: ScoreStore>(
    store: &S,
    submission: ScoreSubmission,
) -> Result<(), ScoreError> {
    let score = submission.validate(Utc::now())?;
    tracing::info!(player = %score.player_name, score = score.score, "client score submitted");
    store.record_score(score).await
}
