//! Per-connection handler: connect, event routing, and teardown.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound channel. The
//! flow is:
//!   1. Parse the handshake query → connect the client
//!   2. Loop: receive frames → decode → dispatch to the controller
//!   3. On close or error → disconnect (starts the grace period)

use std::sync::Arc;

use plaza_protocol::{ClientEvent, Codec, ConnectParams, ServerEvent};
use plaza_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::{PlazaError, SessionController};

/// Drop guard that disconnects the connection when the handler exits.
///
/// Cleanup happens even if the handler panics. Since `Drop` is synchronous,
/// we spawn a fire-and-forget task for the async lock.
struct DisconnectGuard {
    conn_id: ConnectionId,
    controller: SessionController,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), PlazaError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    // The transport's handshake filter already refused bad queries, so this
    // only fails if a connection slipped past without one.
    let params = match ConnectParams::from_query(conn.query()) {
        Ok(params) => params,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e.into());
        }
    };
    tracing::debug!(
        %conn_id,
        client_id = %params.client_id,
        room_id = %params.room_id,
        "handling new connection"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));

    state.controller.connect(params, conn_id, tx).await?;
    let _guard = DisconnectGuard {
        conn_id,
        controller: state.controller.clone(),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed frame");
                continue;
            }
        };

        let name = event.name();
        if let Err(e) = state.controller.handle_event(conn_id, event).await {
            tracing::debug!(%conn_id, event = name, error = %e, "event dropped");
        }
    }

    // _guard drops here → grace period starts.
    Ok(())
}

/// Encodes and sends everything queued for one connection, in order.
///
/// Ends when the controller detaches the connection (the sender is dropped)
/// or when a send fails. Either way the socket is then closed, which is how
/// a connection superseded by a newer one for the same client gets hung up.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let conn_id = conn.id();
    while let Some(event) = rx.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, event = event.name(), error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
            break;
        }
    }
    let _ = conn.close().await;
}
