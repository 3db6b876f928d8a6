//! Per-connection handler: registration, event routing, and mailbox drain.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register a mailbox with the hub → coordinator confirms the connection
//!   2. Loop: decode inbound frames and dispatch them, while writing every
//!      event that lands in the mailbox to the socket
//!   3. On exit the guard runs disconnect cleanup

use std::sync::Arc;

use intercom_channel::dispatch;
use intercom_protocol::{Codec, decode_client_frame, encode_server_event};
use intercom_transport::{Connection, ConnectionId, Frame, WebSocketConnection};
use tokio::sync::mpsc;

use crate::IntercomError;
use crate::server::ServerState;

/// Drop guard that runs disconnect cleanup when the handler exits.
///
/// This ensures cleanup happens even if the handler returns early or
/// panics. Since `Drop` is synchronous, we spawn a fire-and-forget task
/// for the async lock.
struct ConnectionGuard<C: Codec> {
    conn: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn = self.conn;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            {
                let mut coordinator = state.coordinator.lock().await;
                coordinator.disconnect(&state.hub, conn);
            }
            state.hub.unregister(conn);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), IntercomError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // Register the mailbox before confirming, so the confirmation has
    // somewhere to land.
    let (tx, mut mailbox) = mpsc::unbounded_channel();
    state.hub.register(conn_id, tx);
    state.coordinator.lock().await.connect(&state.hub, conn_id);
    let _guard = ConnectionGuard {
        conn: conn_id,
        state: Arc::clone(&state),
    };

    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(frame)) => handle_frame(&state, conn_id, frame).await,
                Ok(None) => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            Some(event) = mailbox.recv() => {
                let frame = encode_server_event(&state.codec, &event)?;
                conn.send(frame).await?;
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close after disconnect failed");
    }

    // _guard drops here → disconnect cleanup fires.
    Ok(())
}

/// Decodes one inbound frame and applies it under the coordinator lock.
///
/// Frames that are not a well-formed client event are dropped.
async fn handle_frame<C: Codec>(state: &ServerState<C>, conn_id: ConnectionId, frame: Frame) {
    let event = match decode_client_frame(&state.codec, frame) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode frame");
            return;
        }
    };

    let mut coordinator = state.coordinator.lock().await;
    dispatch(&mut coordinator, &state.hub, conn_id, event);
}
