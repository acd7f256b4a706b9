//! Per-connection handler: event loop and outbound writer.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound channel with the hub → client gets
//!      `connection:ready`
//!   2. Spawn a writer that drains the channel into the socket
//!   3. Loop: receive frames → decode → route

use std::sync::Arc;

use tokio::sync::mpsc;
use typerace_protocol::{ClientEvent, Codec, JsonCodec, ParticipantId, ServerEvent};
use typerace_transport::{Connection, WebSocketConnection};

use crate::server::ServerState;
use crate::TyperaceError;

/// Drop guard that removes a participant when the handler exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// cleanup is spawned as a fire-and-forget task.
struct DisconnectGuard {
    participant: ParticipantId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let participant = self.participant;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.router.disconnect(participant).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), TyperaceError> {
    let conn = Arc::new(conn);
    let participant = ParticipantId::from(conn.id());
    tracing::info!(%participant, "connection opened");

    let (tx, rx) = mpsc::unbounded_channel();
    state.router.connect(participant, tx).await;
    let _guard = DisconnectGuard {
        participant,
        state: Arc::clone(&state),
    };

    let writer = tokio::spawn(write_events(Arc::clone(&conn), rx, state.codec));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%participant, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%participant, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%participant, error = %e, "failed to decode event");
                state.router.reject_frame(participant, &e.to_string()).await;
                continue;
            }
        };

        state.router.dispatch(participant, event).await;
    }

    writer.abort();
    // _guard drops here → room leave and hub unregister fire.
    Ok(())
}

/// Encodes queued events and writes them to the socket until the hub
/// drops the sender or the socket fails.
async fn write_events(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    codec: JsonCodec,
) -> Result<(), TyperaceError> {
    while let Some(event) = rx.recv().await {
        let text = codec.encode_text(&event)?;
        if let Err(e) = conn.send_text(&text).await {
            tracing::debug!(id = %conn.id(), event = event.name(), error = %e, "send failed");
            return Err(e.into());
        }
    }
    Ok(())
}
