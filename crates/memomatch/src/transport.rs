//! WebSocket transport.
//!
//! The handler only needs something that can send and receive whole
//! messages, so it is written against the [`Connection`] trait. The real
//! server plugs in [`WebSocketConnection`]; unit tests plug in an
//! in-memory channel.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

/// Opaque identifier for a connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that carries whole messages.
pub trait Connection: Send + Sync + 'static {
    /// Sends one message to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next message.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// Listens for WebSocket connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a listener to `addr`. Use port 0 to let the OS pick one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "listening for players");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next client and upgrades it to a WebSocket.
    ///
    /// A client that connects but fails the upgrade is reported as an
    /// error; the listener itself stays usable.
    pub async fn accept(&self) -> Result<WebSocketConnection, TransportError> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let ws = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(|e| io_error(std::io::ErrorKind::InvalidData, e))
            .map_err(TransportError::AcceptFailed)?;
        Ok(WebSocketConnection::new(ws, peer))
    }
}

/// One upgraded WebSocket, split into independently locked halves so a
/// reply can go out while the handler is parked in `recv`.
///
/// Outgoing UTF-8 payloads go out as text frames so a browser receives a
/// string it can hand straight to `JSON.parse`.
pub struct WebSocketConnection {
    id: ConnectionId,
    outgoing: Mutex<SplitSink<WsStream, Message>>,
    incoming: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn new(ws: WsStream, peer: SocketAddr) -> Self {
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "player socket upgraded");
        let (outgoing, incoming) = ws.split();
        Self {
            id,
            outgoing: Mutex::new(outgoing),
            incoming: Mutex::new(incoming),
        }
    }
}

fn io_error<E>(kind: std::io::ErrorKind, e: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::new(kind, e)
}

/// Frame to send for an encoded message.
fn outgoing_frame(data: &[u8]) -> Message {
    match std::str::from_utf8(data) {
        Ok(text) => Message::text(text.to_owned()),
        Err(_) => Message::binary(data.to_vec()),
    }
}

/// Payload of a data frame. Control frames carry nothing for the handler.
fn frame_payload(frame: Message) -> Option<Vec<u8>> {
    match frame {
        Message::Text(text) => Some(text.as_bytes().to_vec()),
        Message::Binary(bytes) => Some(bytes.to_vec()),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.outgoing
            .lock()
            .await
            .send(outgoing_frame(data))
            .await
            .map_err(|e| TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut incoming = self.incoming.lock().await;
        while let Some(frame) = incoming.next().await {
            let frame = frame.map_err(|e| {
                TransportError::ReceiveFailed(io_error(std::io::ErrorKind::ConnectionReset, e))
            })?;
            if frame.is_close() {
                break;
            }
            if let Some(data) = frame_payload(frame) {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.outgoing
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_frame_picks_text_for_utf8() {
        assert!(outgoing_frame(b"{}").is_text());
        assert!(outgoing_frame(&[0xff, 0xfe]).is_binary());
    }

    #[test]
    fn test_frame_payload_skips_control_frames() {
        assert_eq!(frame_payload(Message::text("hi".to_string())), Some(b"hi".to_vec()));
        assert_eq!(frame_payload(Message::binary(vec![1, 2])), Some(vec![1, 2]));
        assert_eq!(frame_payload(Message::Ping(Vec::new().into())), None);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(42).into_inner(), 42);
    }

    #[tokio::test]
    async fn test_websocket_text_frames_round_trip() {
        let transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let server = tokio::spawn(async move { transport.accept().await.unwrap() });
        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.unwrap();

        conn.send(br#"{"hello":"browser"}"#).await.unwrap();
        let frame = client.next().await.unwrap().unwrap();
        assert!(frame.is_text(), "UTF-8 payloads should be text frames");
        assert_eq!(frame.into_text().unwrap().as_str(), r#"{"hello":"browser"}"#);

        client
            .send(Message::Text("from client".to_string().into()))
            .await
            .unwrap();
        let received = conn.recv().await.unwrap();
        assert_eq!(received.as_deref(), Some(&b"from client"[..]));

        client.close(None).await.unwrap();
        assert_eq!(conn.recv().await.unwrap(), None);
    }
}
