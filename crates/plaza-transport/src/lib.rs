//! Sockets for Plaza.
//!
//! Everything above this crate works with two traits: a [`Transport`] that
//! hands out connections whose handshake already passed, and a
//! [`Connection`] that moves whole frames as bytes. The WebSocket
//! implementation also answers plain-HTTP liveness checks on its listener.
//!
//! A [`ConnectionId`] names one socket for as long as it lives. Client
//! identity is a separate thing, layered on top by `plaza-session`.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] via `axum` and `tower-http`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{HandshakeFilter, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Names one accepted socket.
///
/// Ids are handed out from a process-wide counter and never reused, so a
/// reconnecting client always arrives under a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that yields handshaken connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next connection whose handshake succeeded.
    ///
    /// Refused upgrades and liveness requests are dealt with inside and
    /// never returned. Fails with [`TransportError::Closed`] once the
    /// listener has stopped for good.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops taking new connections. Live ones are left alone.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One peer, exchanging whole frames.
///
/// Methods take `&self` so a reader and a writer task can share one
/// connection.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Query string of the request that opened this connection, without
    /// the leading `?`. This is how the client introduced itself.
    fn query(&self) -> Option<&str>;
}
