//! Wire protocol for Plaza.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identities** ([`ClientId`], [`RoomId`]) and the validated handshake
//!   parameters ([`ConnectParams`]).
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): the named messages
//!   that travel after the handshake.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about sockets or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Session (client identity)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    ChatMessage, ChatRequest, ClientEvent, MovementInfo, MovementRequest,
    ServerEvent,
};
pub use types::{ClientId, ConnectParams, RoomId};
