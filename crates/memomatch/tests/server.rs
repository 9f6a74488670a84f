//! Integration tests for the Memomatch server over real WebSockets.

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use memomatch::prelude::*;
use memomatch_game::CardFace;
use memomatch_protocol::PROTOCOL_VERSION;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server(config: ServerConfig) -> String {
    let server = MemomatchServerBuilder::new()
        .config(config.bind("127.0.0.1:0"))
        .build(MemoryScoreStore::new())
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: Payload) {
    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        payload,
    };
    let json = serde_json::to_string(&envelope).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn send_game(ws: &mut ClientWs, msg: GameMessage) {
    send(ws, Payload::Game(msg)).await;
}

async fn recv(ws: &mut ClientWs) -> Envelope {
    let deadline = Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for server")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Binary(bytes) => return serde_json::from_slice(&bytes).unwrap(),
            _ => continue,
        }
    }
}

async fn recv_game(ws: &mut ClientWs) -> GameMessage {
    match recv(ws).await.payload {
        Payload::Game(msg) => msg,
        other => panic!("expected game message, got {other:?}"),
    }
}

async fn recv_error(ws: &mut ClientWs) -> (u16, String) {
    match recv(ws).await.payload {
        Payload::System(SystemMessage::Error { code, message }) => (code, message),
        other => panic!("expected error, got {other:?}"),
    }
}

/// Connects and completes the handshake.
async fn connect_and_handshake(addr: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send(
        &mut ws,
        Payload::System(SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
        }),
    )
    .await;
    let ack = recv(&mut ws).await;
    assert!(matches!(
        ack.payload,
        Payload::System(SystemMessage::HandshakeAck { .. })
    ));
    ws
}

async fn start_game(ws: &mut ClientWs, name: &str, difficulty: &str) -> usize {
    send_game(
        ws,
        GameMessage::StartGame {
            player_name: name.into(),
            difficulty: difficulty.into(),
        },
    )
    .await;
    match recv_game(ws).await {
        GameMessage::GameStarted { board_len, .. } => board_len,
        other => panic!("expected GameStarted, got {other:?}"),
    }
}

async fn flip(ws: &mut ClientWs, index: usize) -> (CardFace, FlipStatus) {
    send_game(ws, GameMessage::FlipCard { index }).await;
    match recv_game(ws).await {
        GameMessage::CardFlipped { face, status, .. } => (face, status),
        other => panic!("expected CardFlipped, got {other:?}"),
    }
}

/// Plays a round to the end: one pass to learn every face, then a pass
/// flipping the known pairs. Returns the `GameEnded` message.
async fn solve(ws: &mut ClientWs, board_len: usize) -> GameMessage {
    let mut positions: BTreeMap<CardFace, Vec<usize>> = BTreeMap::new();
    for index in 0..board_len {
        let (face, status) = flip(ws, index).await;
        positions.entry(face).or_default().push(index);
        if status == FlipStatus::Completed {
            return recv_game(ws).await;
        }
    }

    for pair in positions.values() {
        let (_, status) = flip(ws, pair[0]).await;
        if status == FlipStatus::AlreadyMatched {
            continue;
        }
        let (_, status) = flip(ws, pair[1]).await;
        if status == FlipStatus::Completed {
            return recv_game(ws).await;
        }
    }
    panic!("board was not completed");
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_returns_ack() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
        }),
    )
    .await;

    match recv(&mut ws).await.payload {
        Payload::System(SystemMessage::HandshakeAck { connection_id, .. }) => {
            assert!(connection_id > 0);
        }
        other => panic!("expected HandshakeAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_game_message_before_handshake_is_rejected() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect(&addr).await;

    send_game(&mut ws, GameMessage::GetScores { limit: None }).await;

    let (code, _) = recv_error(&mut ws).await;
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect_and_handshake(&addr).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Heartbeat { client_time: 1234 }),
    )
    .await;

    assert!(matches!(
        recv(&mut ws).await.payload,
        Payload::System(SystemMessage::HeartbeatAck {
            client_time: 1234,
            ..
        })
    ));
}

// =========================================================================
// Rounds and leaderboard
// =========================================================================

#[tokio::test]
async fn test_full_round_is_scored_and_listed() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect_and_handshake(&addr).await;

    let board_len = start_game(&mut ws, "alice", "easy").await;
    assert_eq!(board_len, 12);

    match solve(&mut ws, board_len).await {
        GameMessage::GameEnded {
            success,
            score,
            timed_out,
            recorded,
            elapsed_secs,
        } => {
            assert!(success);
            assert!(!timed_out);
            assert!(recorded);
            assert_eq!(score, 1000 - 2 * elapsed_secs as i64);
        }
        other => panic!("expected GameEnded, got {other:?}"),
    }

    send_game(&mut ws, GameMessage::GetScores { limit: Some(5) }).await;
    match recv_game(&mut ws).await {
        GameMessage::Scores { entries } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].player_name, "a****");
            assert_eq!(entries[0].difficulty, Difficulty::Easy);
        }
        other => panic!("expected Scores, got {other:?}"),
    }
}

#[tokio::test]
async fn test_leaderboard_is_shared_and_ordered() {
    let addr = start_server(ServerConfig::default()).await;

    let mut winner = connect_and_handshake(&addr).await;
    let board_len = start_game(&mut winner, "winner", "easy").await;
    solve(&mut winner, board_len).await;

    let mut quitter = connect_and_handshake(&addr).await;
    start_game(&mut quitter, "quitter", "normal").await;
    send_game(&mut quitter, GameMessage::EndGame { success: false }).await;
    assert!(matches!(
        recv_game(&mut quitter).await,
        GameMessage::GameEnded { score: 0, .. }
    ));

    send_game(&mut quitter, GameMessage::GetScores { limit: None }).await;
    match recv_game(&mut quitter).await {
        GameMessage::Scores { entries } => {
            let names: Vec<_> = entries.iter().map(|e| e.player_name.as_str()).collect();
            assert_eq!(names, ["w*****", "q******"]);
        }
        other => panic!("expected Scores, got {other:?}"),
    }
}

#[tokio::test]
async fn test_new_round_after_end_starts_fresh() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect_and_handshake(&addr).await;

    start_game(&mut ws, "bob", "easy").await;
    send_game(&mut ws, GameMessage::EndGame { success: false }).await;
    recv_game(&mut ws).await;

    let board_len = start_game(&mut ws, "bob", "normal").await;
    assert_eq!(board_len, 20);
    let (_, status) = flip(&mut ws, 0).await;
    assert_eq!(status, FlipStatus::Flipped);
}

#[tokio::test]
async fn test_empty_player_name_is_rejected() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect_and_handshake(&addr).await;

    send_game(
        &mut ws,
        GameMessage::StartGame {
            player_name: "  ".into(),
            difficulty: "easy".into(),
        },
    )
    .await;

    let (code, _) = recv_error(&mut ws).await;
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_round_times_out() {
    let config = ServerConfig::default().time_limit(Duration::from_millis(100));
    let addr = start_server(config).await;
    let mut ws = connect_and_handshake(&addr).await;

    start_game(&mut ws, "slow", "easy").await;

    match recv_game(&mut ws).await {
        GameMessage::GameEnded {
            success,
            timed_out,
            score,
            recorded,
            ..
        } => {
            assert!(!success);
            assert!(timed_out);
            assert_eq!(score, 0);
            assert!(recorded);
        }
        other => panic!("expected GameEnded, got {other:?}"),
    }

    send_game(&mut ws, GameMessage::FlipCard { index: 0 }).await;
    let (code, _) = recv_error(&mut ws).await;
    assert_eq!(code, 409);
}

#[tokio::test]
async fn test_submit_score_requires_opt_in() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect_and_handshake(&addr).await;

    send_game(
        &mut ws,
        GameMessage::SubmitScore(memomatch_scores::ScoreSubmission {
            player_name: "cheater".into(),
            score: 1000,
            difficulty: "easy".into(),
            time_taken: 0,
        }),
    )
    .await;

    let (code, _) = recv_error(&mut ws).await;
    assert_eq!(code, 403);
}

#[tokio::test]
async fn test_submit_score_when_enabled_shows_on_leaderboard() {
    let addr = start_server(ServerConfig::default().accept_client_scores(true)).await;
    let mut ws = connect_and_handshake(&addr).await;

    send_game(
        &mut ws,
        GameMessage::SubmitScore(memomatch_scores::ScoreSubmission {
            player_name: "  carol  ".into(),
            score: 960,
            difficulty: "normal".into(),
            time_taken: 20,
        }),
    )
    .await;
    assert_eq!(recv_game(&mut ws).await, GameMessage::ScoreAccepted);

    send_game(&mut ws, GameMessage::GetScores { limit: None }).await;
    match recv_game(&mut ws).await {
        GameMessage::Scores { entries } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].player_name, "c****");
            assert_eq!(entries[0].score, 960);
            assert_eq!(entries[0].elapsed_secs, 20);
        }
        other => panic!("expected Scores, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let addr = start_server(ServerConfig::default()).await;
    let mut ws = connect_and_handshake(&addr).await;

    send(
        &mut ws,
        Payload::System(SystemMessage::Disconnect {
            reason: "bye".into(),
        }),
    )
    .await;

    let next = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(next.is_ok(), "server should close the connection");
}
