//! Rooms for Plaza.
//!
//! A room is a named group of clients that see each other's movement and
//! chat. This crate holds who is in which room and pushes events out to
//! them.
//!
//! # Key types
//!
//! - [`RoomIndex`]: room id → ordered member list
//! - [`Broadcaster`]: per-connection outbound channels and fan-out
//! - [`Target`]: who in the room receives an event
//!
//! Neither type locks anything. The `plaza` crate owns them, together with
//! the session stores, behind a single mutex.

mod broadcast;
mod error;
mod room;

pub use broadcast::{Broadcaster, ClientSender, Target};
pub use error::RoomError;
pub use room::RoomIndex;
