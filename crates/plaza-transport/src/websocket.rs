//! WebSocket transport served by an axum router.
//!
//! One listener carries both the WebSocket upgrades and the plain-HTTP
//! liveness routes. axum serves every TCP connection on its own task, so a
//! slow or silent peer never holds up anybody else's handshake. Upgraded
//! sockets are handed to [`Transport::accept`] through a channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc, watch};
use tower_http::cors::CorsLayer;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Decides whether an upgrade request may proceed, given its query string.
///
/// Returning `Err(reason)` answers the upgrade with `400 Bad Request` and
/// `reason` as the body. No WebSocket session is created.
pub type HandshakeFilter =
    Arc<dyn Fn(Option<&str>) -> Result<(), String> + Send + Sync>;

/// Router state: the upgrade policy and where finished upgrades go.
#[derive(Clone)]
struct Gate {
    filter: Option<HandshakeFilter>,
    accepted: mpsc::UnboundedSender<WebSocketConnection>,
}

/// A WebSocket-based [`Transport`].
///
/// Routes on the listener:
/// - `GET /` with an upgrade: a new connection, if the filter allows it
/// - `GET /` without one: `{"message":"my server is running"}`
/// - `GET /health`: `{"message":"OK"}`
/// - anything else: `404 {"message":"Not Found"}`
///
/// Every response carries permissive CORS headers that mirror the request
/// `Origin` and allow credentials.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    accepted: mpsc::UnboundedReceiver<WebSocketConnection>,
    stop: watch::Sender<bool>,
}

impl WebSocketTransport {
    /// Binds a transport that accepts every upgrade.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::serve(addr, None).await
    }

    /// Binds a transport that runs `filter` against every upgrade request.
    pub async fn bind_with_filter(
        addr: &str,
        filter: impl Fn(Option<&str>) -> Result<(), String>
            + Send
            + Sync
            + 'static,
    ) -> Result<Self, TransportError> {
        Self::serve(addr, Some(Arc::new(filter))).await
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn serve(
        addr: &str,
        filter: Option<HandshakeFilter>,
    ) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        let local_addr = listener.local_addr().map_err(TransportError::Bind)?;

        let (tx, accepted) = mpsc::unbounded_channel();
        let (stop, mut stopped) = watch::channel(false);
        let router = build_router(Gate {
            filter,
            accepted: tx,
        });

        tokio::spawn(async move {
            let shutdown = async move {
                let _ = stopped.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "WebSocket listener failed");
            }
        });

        tracing::info!(%local_addr, "WebSocket transport listening");
        Ok(Self {
            local_addr,
            accepted,
            stop,
        })
    }
}

fn build_router(gate: Gate) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .fallback(not_found)
        .with_state(gate)
        .layer(CorsLayer::very_permissive())
}

/// Upgrades when asked to, otherwise answers as a liveness check.
async fn root_handler(
    State(gate): State<Gate>,
    RawQuery(query): RawQuery,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => gate.upgrade(ws, query),
        Err(_) => Json(serde_json::json!({ "message": "my server is running" }))
            .into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "OK" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Not Found" })),
    )
}

impl Gate {
    fn upgrade(self, ws: WebSocketUpgrade, query: Option<String>) -> Response {
        if let Some(filter) = &self.filter {
            if let Err(reason) = filter(query.as_deref()) {
                tracing::info!(
                    query = query.as_deref().unwrap_or(""),
                    %reason,
                    "upgrade refused"
                );
                return (StatusCode::BAD_REQUEST, reason).into_response();
            }
        }

        let accepted = self.accepted;
        ws.on_upgrade(move |socket: WebSocket| async move {
            let id = ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            );
            tracing::debug!(%id, "accepted WebSocket connection");

            let (sink, stream) = socket.split();
            let conn = WebSocketConnection {
                id,
                query,
                sink: Mutex::new(sink),
                stream: Mutex::new(stream),
            };
            if accepted.send(conn).is_err() {
                tracing::debug!(%id, "transport shut down, connection dropped");
            }
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.accepted.recv().await.ok_or(TransportError::Closed)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.stop.send_replace(true);
        Ok(())
    }
}

/// A single WebSocket connection.
///
/// The socket is split into independently locked halves so a writer task
/// can push events while the reader is parked in `recv`.
pub struct WebSocketConnection {
    id: ConnectionId,
    query: Option<String>,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends UTF-8 payloads as text frames and anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(std::io::Error::other(e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::other(e),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(std::io::Error::other(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}
