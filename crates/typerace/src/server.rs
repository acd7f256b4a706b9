//! `TyperaceServer` builder and accept loop.
//!
//! This is the entry point for running a Typerace server. It ties the
//! layers together: transport → protocol → router → rooms.

use std::sync::Arc;
use std::time::Duration;

use typerace_protocol::JsonCodec;
use typerace_room::{SentencePool, SequencerConfig, TextSource};
use typerace_tick::{Clock, SystemClock};
use typerace_transport::{DEFAULT_HANDSHAKE_TIMEOUT, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Router, TyperaceError};

/// Bind address used by the `typerace-server` binary when
/// `TYPERACE_BIND` is not set.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) router: Router,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Typerace server.
///
/// # Example
///
/// ```rust,ignore
/// let server = TyperaceServer::builder()
///     .bind("127.0.0.1:0")
///     .text_source(FixedText("practice makes perfect".into()))
///     .build()
///     .await?;
/// let addr = server.local_addr()?;
/// server.run().await
/// ```
pub struct TyperaceServerBuilder {
    bind_addr: String,
    sequencer_config: SequencerConfig,
    text_source: Option<Box<dyn TextSource>>,
    clock: Option<Arc<dyn Clock>>,
    handshake_timeout: Duration,
}

impl TyperaceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            sequencer_config: SequencerConfig::default(),
            text_source: None,
            clock: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the countdown timing.
    pub fn sequencer_config(mut self, config: SequencerConfig) -> Self {
        self.sequencer_config = config;
        self
    }

    /// Sets where race text comes from. Defaults to [`SentencePool`].
    pub fn text_source(mut self, source: impl TextSource) -> Self {
        self.text_source = Some(Box::new(source));
        self
    }

    /// Sets the clock used for progress and start timestamps. Defaults to
    /// [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets how long a client gets to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, limit: Duration) -> Self {
        self.handshake_timeout = limit;
        self
    }

    /// Binds the listener and assembles the server.
    pub async fn build(self) -> Result<TyperaceServer, TyperaceError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let text_source = self
            .text_source
            .unwrap_or_else(|| Box::new(SentencePool::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let state = Arc::new(ServerState {
            router: Router::new(self.sequencer_config, text_source, clock),
            codec: JsonCodec,
        });

        Ok(TyperaceServer {
            transport,
            state,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

impl Default for TyperaceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Typerace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TyperaceServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    handshake_timeout: Duration,
}

impl TyperaceServer {
    /// Creates a new builder.
    pub fn builder() -> TyperaceServerBuilder {
        TyperaceServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each peer is upgraded on its own task, so the loop goes straight
    /// back to accepting.
    pub async fn run(mut self) -> Result<(), TyperaceError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "typerace server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    let limit = self.handshake_timeout;
                    tokio::spawn(async move {
                        let addr = pending.peer_addr();
                        let conn = match pending.upgrade(limit).await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%addr, error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
