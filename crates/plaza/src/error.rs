//! Unified error type for Plaza.

use plaza_protocol::ProtocolError;
use plaza_room::RoomError;
use plaza_session::SessionError;
use plaza_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlazaError {
    /// Binding, accepting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A handshake query or a frame could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An event could not be resolved to a client or had a bad payload.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Room membership was not what the operation expected.
    #[error(transparent)]
    Room(#[from] RoomError),
}
