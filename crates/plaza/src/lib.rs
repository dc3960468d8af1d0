//! # Plaza
//!
//! Real-time presence and relay server for shared 2D rooms.
//!
//! Clients open a WebSocket naming who they are and which room they want.
//! Plaza places them in the room, tells everyone already there about the
//! newcomer, and from then on relays chat lines and position updates to
//! every member. A client whose connection drops keeps its place (and its
//! position) for a short grace period, so a page reload or a network blip
//! resumes seamlessly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plaza::prelude::*;
//!
//! # async fn start() -> Result<(), PlazaError> {
//! let server = PlazaServer::builder()
//!     .bind("0.0.0.0:8000")
//!     .reconnect_grace(std::time::Duration::from_secs(5))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! Clients connect with
//! `ws://host:8000/?client_id=...&user_name=...&room_type=...&room_id=...`
//! and exchange `{"event": ..., "data": {...}}` text frames.

mod controller;
mod error;
mod handler;
mod server;

pub use controller::SessionController;
pub use error::PlazaError;
pub use server::{DEFAULT_BIND_ADDR, PlazaServer, PlazaServerBuilder};

pub use plaza_protocol as protocol;
pub use plaza_room as room;
pub use plaza_session as session;
pub use plaza_transport as transport;

/// Everything needed to embed a Plaza server.
pub mod prelude {
    pub use crate::{PlazaError, PlazaServer, PlazaServerBuilder, SessionController};
    pub use plaza_protocol::{
        ChatMessage, ChatRequest, ClientEvent, ClientId, ConnectParams,
        MovementInfo, MovementRequest, RoomId, ServerEvent,
    };
    pub use plaza_session::{Client, SessionConfig};
}
