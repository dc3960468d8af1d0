//! Error types for the session layer.

use plaza_protocol::ClientId;
use plaza_transport::ConnectionId;

/// Errors that can occur while resolving or mutating session state.
///
/// Every one of these ends up as a dropped event and a log line. Clients
/// never see them.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection has no client bound to it: it never completed a
    /// connect, or its binding was replaced by a newer connection.
    #[error("no client bound to {0}")]
    UnknownConnection(ConnectionId),

    /// The client has no directory entry (never joined, or evicted).
    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    /// The connection is already bound to a different client. A connection
    /// keeps the identity it connected with for its whole lifetime.
    #[error("{0} is already bound to client {1}")]
    ConnectionAlreadyBound(ConnectionId, ClientId),

    /// The event payload lacks a field the operation requires.
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),
}
