//! The broadcast engine: fan events out to a room's live connections.
//!
//! Delivery never touches the network directly. Each live connection has an
//! unbounded channel drained by its own writer task; delivering an event is
//! a non-blocking push onto that channel. That keeps fan-out safe to run
//! while the shared session lock is held.

use std::collections::HashMap;

use plaza_protocol::{ClientId, RoomId, ServerEvent};
use plaza_session::ConnectionRegistry;
use plaza_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::RoomIndex;

/// Channel sender for delivering outbound events to one connection.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

/// Who should receive an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every member of the room that currently has a live connection.
    AllMembers,

    /// Every member except the given client.
    AllExcept(ClientId),

    /// One specific connection, whoever it belongs to.
    Connection(ConnectionId),
}

/// Outbound channels for every live connection.
#[derive(Debug, Default)]
pub struct Broadcaster {
    outbox: HashMap<ConnectionId, ClientSender>,
}

impl Broadcaster {
    /// Creates a broadcaster with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outbound channel for a connection.
    pub fn attach(&mut self, conn: ConnectionId, sender: ClientSender) {
        self.outbox.insert(conn, sender);
    }

    /// Forgets a connection's channel. Dropping the sender ends the
    /// connection's writer task once it has flushed what was queued.
    pub fn detach(&mut self, conn: ConnectionId) -> Option<ClientSender> {
        self.outbox.remove(&conn)
    }

    /// Delivers `event` to the members of `room_id` selected by `target`.
    ///
    /// Members are visited in join order. A member with no live binding (in
    /// its grace period) is skipped: nothing is queued for it. A
    /// [`Target::Connection`] goes to that one connection and ignores
    /// `room_id`. Returns how many connections the event was pushed to.
    pub fn deliver(
        &self,
        event: &ServerEvent,
        room_id: &RoomId,
        target: &Target,
        rooms: &RoomIndex,
        registry: &ConnectionRegistry,
    ) -> usize {
        let mut delivered = 0;

        match target {
            Target::Connection(conn) => {
                if self.send_to(*conn, event) {
                    delivered += 1;
                }
            }
            Target::AllMembers | Target::AllExcept(_) => {
                for member in rooms.members(room_id) {
                    if matches!(target, Target::AllExcept(skip) if skip == member)
                    {
                        continue;
                    }
                    let Some(conn) = registry.connection_of(member) else {
                        tracing::trace!(
                            client_id = %member,
                            event = event.name(),
                            "skipping member without live connection"
                        );
                        continue;
                    };
                    if self.send_to(conn, event) {
                        delivered += 1;
                    }
                }
            }
        }

        delivered
    }

    /// Pushes one event onto one connection's channel.
    ///
    /// Returns `false` if the connection is unknown or its writer is gone.
    fn send_to(&self, conn: ConnectionId, event: &ServerEvent) -> bool {
        let Some(sender) = self.outbox.get(&conn) else {
            return false;
        };
        if sender.send(event.clone()).is_err() {
            tracing::debug!(%conn, event = event.name(), "writer gone, event dropped");
            return false;
        }
        true
    }

    /// Number of attached connections.
    pub fn len(&self) -> usize {
        self.outbox.len()
    }

    /// Returns `true` if no connections are attached.
    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }
}
