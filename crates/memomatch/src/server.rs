//! `MemomatchServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → per-connection game
//! session, with one score store shared by every connection.

use std::sync::Arc;

use memomatch_protocol::{Codec, JsonCodec};
use memomatch_scores::ScoreStore;

use crate::MemomatchError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::transport::WebSocketTransport;

/// State shared by every connection handler task.
///
/// Game sessions are not in here: each handler owns its own.
pub(crate) struct ServerState<S: ScoreStore, K: Codec> {
    pub(crate) store: S,
    pub(crate) codec: K,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Memomatch server.
///
/// # Example
///
/// ```rust,no_run
/// use memomatch::prelude::*;
///
/// # async fn start() -> Result<(), MemomatchError> {
/// let server = MemomatchServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(MemoryScoreStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct MemomatchServerBuilder {
    config: ServerConfig,
}

impl MemomatchServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration, bind address included.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and returns a server that records finished
    /// rounds in `store`.
    pub async fn build<S: ScoreStore>(
        self,
        store: S,
    ) -> Result<MemomatchServer<S, JsonCodec>, MemomatchError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            store,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(MemomatchServer { transport, state })
    }
}

impl Default for MemomatchServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Memomatch server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct MemomatchServer<S: ScoreStore, K: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, K>>,
}

impl<S, K> MemomatchServer<S, K>
where
    S: ScoreStore,
    K: Codec + Send + Sync + 'static,
{
    /// Creates a new builder.
    pub fn builder() -> MemomatchServerBuilder {
        MemomatchServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), MemomatchError> {
        tracing::info!(
            time_limit_secs = self.state.config.time_limit.as_secs(),
            "Memomatch server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
