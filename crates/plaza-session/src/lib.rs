//! Client sessions for Plaza.
//!
//! A client is identified by the [`ClientId`](plaza_protocol::ClientId) it
//! presents in its handshake, not by its socket. This crate holds the three
//! stores that make that work:
//!
//! 1. **Connection registry** ([`ConnectionRegistry`]): live socket ↔ client
//! 2. **Client directory** ([`ClientDirectory`]): room, name, position,
//!    direction of every known client
//! 3. **Reconnection tracker** ([`ReconnectionTracker`]): clients that
//!    dropped and still have time to come back
//!
//! The stores are plain single-owner structs. The `plaza` crate puts them
//! behind one lock together with the room index, so every session
//! transition is applied atomically.
//!
//! # Lifecycle of one client id
//!
//! ```text
//! Absent ──connect──→ Connected ──drop──→ Disconnected (grace)
//!                         ↑                    │      │
//!                         └──────connect───────┘      └─timeout─→ Absent
//! ```

mod config;
mod directory;
mod error;
mod registry;
mod tracker;

pub use config::{GRACE_PERIOD, SessionConfig};
pub use directory::{
    Client, ClientDirectory, DEFAULT_DIRECTION, DEFAULT_POSITION_X,
    DEFAULT_POSITION_Y, DEFAULT_SPRITE, Upsert,
};
pub use error::SessionError;
pub use registry::ConnectionRegistry;
pub use tracker::{GraceTicket, PendingDisconnect, ReconnectionTracker};
