//! The session controller: every state transition a client goes through.
//!
//! All stores live in one [`World`] behind one `tokio::sync::Mutex`. Each
//! public operation takes the lock once and runs its whole
//! read-modify-write under it, so a connect can never interleave with a
//! movement or an eviction halfway through.
//!
//! ```text
//!            connect()                 disconnect()
//!  Absent ─────────────→ Connected ──────────────────→ Disconnected
//!                          ↑  │ chat() / movement()        │   │
//!                          │  └──────────┘                 │   │ grace elapsed
//!                          └────────── connect() ──────────┘   └──→ Absent
//! ```

use std::sync::Arc;

use plaza_protocol::{
    ChatMessage, ChatRequest, ClientEvent, ClientId, ConnectParams,
    MovementRequest, RoomId, ServerEvent,
};
use plaza_room::{Broadcaster, ClientSender, RoomIndex, Target};
use plaza_session::{
    Client, ClientDirectory, ConnectionRegistry, GraceTicket,
    ReconnectionTracker, SessionConfig, SessionError, Upsert,
};
use plaza_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::PlazaError;

/// Everything the server knows, in one place.
///
/// Initialized empty at startup, never persisted, gone with the process.
#[derive(Debug, Default)]
struct World {
    registry: ConnectionRegistry,
    clients: ClientDirectory,
    rooms: RoomIndex,
    pending: ReconnectionTracker,
    broadcaster: Broadcaster,
}

/// Orchestrates connect, disconnect, chat, and movement.
///
/// Cheap to clone: clones share the same world. Grace-period timer tasks
/// hold a clone so they can evict when they fire.
#[derive(Clone)]
pub struct SessionController {
    world: Arc<Mutex<World>>,
    config: SessionConfig,
}

impl SessionController {
    /// Creates a controller over an empty world.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            world: Arc::new(Mutex::new(World::default())),
            config,
        }
    }

    /// The session configuration in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Admits a client on a new connection.
    ///
    /// Cancels a pending eviction for the same client id, creates or
    /// refreshes its directory entry (keeping position and direction on a
    /// resume), binds it to `conn`, and exchanges presence:
    /// - every other member with a live connection receives the client's
    ///   snapshot
    /// - the new connection receives one snapshot per member, itself
    ///   included, in join order
    ///
    /// # Errors
    /// Returns [`SessionError::ConnectionAlreadyBound`] if `conn` already
    /// belongs to another client. Nothing is changed in that case.
    pub async fn connect(
        &self,
        params: ConnectParams,
        conn: ConnectionId,
        sender: ClientSender,
    ) -> Result<(), PlazaError> {
        let mut world = self.world.lock().await;
        let World {
            registry,
            clients,
            rooms,
            pending,
            broadcaster,
        } = &mut *world;

        let ConnectParams {
            client_id,
            user_name,
            room_type,
            room_id,
        } = params;

        if let Some(superseded) = registry.bind(client_id.clone(), conn)? {
            broadcaster.detach(superseded);
            tracing::info!(
                %client_id,
                old = %superseded,
                new = %conn,
                "client opened a second connection, old one superseded"
            );
        }
        broadcaster.attach(conn, sender);

        let resumed = pending.cancel(&client_id).is_some();

        rooms.ensure(&room_id);
        let outcome =
            clients.upsert(&client_id, room_id.clone(), user_name, room_type);
        if let Upsert::Resumed { previous_room } = &outcome {
            if *previous_room != room_id {
                tracing::warn!(
                    %client_id,
                    from = %previous_room,
                    to = %room_id,
                    "client resumed into a different room, position kept"
                );
                if rooms.contains(previous_room, &client_id) {
                    rooms.leave(previous_room, &client_id)?;
                }
            }
        }

        let client = clients
            .get(&client_id)
            .ok_or_else(|| SessionError::UnknownClient(client_id.clone()))?;
        let joined = ServerEvent::MovementInfo(client.snapshot(&client_id));
        broadcaster.deliver(
            &joined,
            &room_id,
            &Target::AllExcept(client_id.clone()),
            rooms,
            registry,
        );

        rooms.join(&room_id, &client_id);

        let own = Target::Connection(conn);
        for member in rooms.members(&room_id) {
            let Some(state) = clients.get(member) else {
                tracing::warn!(
                    client_id = %member,
                    %room_id,
                    "room member missing from directory"
                );
                continue;
            };
            let snapshot = ServerEvent::MovementInfo(state.snapshot(member));
            broadcaster.deliver(&snapshot, &room_id, &own, rooms, registry);
        }

        tracing::info!(
            %client_id,
            %conn,
            %room_id,
            resumed,
            created = outcome == Upsert::Created,
            online = registry.len(),
            "client connected"
        );
        Ok(())
    }

    /// Handles a dropped connection.
    ///
    /// Unbinds it and starts the grace period for its client. The client
    /// stays in its room (skipped by fan-out) until either a connect with
    /// the same id arrives or the grace period runs out and a timer task
    /// evicts it.
    ///
    /// Returns `None` if the connection had no client bound to it (it never
    /// connected, or was superseded); nothing happens in that case.
    pub async fn disconnect(&self, conn: ConnectionId) -> Option<GraceTicket> {
        let mut world = self.world.lock().await;
        world.broadcaster.detach(conn);

        let Some(client_id) = world.registry.unbind(conn) else {
            tracing::debug!(%conn, "unbound connection dropped");
            return None;
        };
        let Some(room_id) = world.clients.get(&client_id).map(|c| c.room_id.clone())
        else {
            tracing::warn!(%client_id, "bound client missing from directory");
            return None;
        };

        let ticket = world.pending.begin(
            client_id.clone(),
            room_id.clone(),
            self.config.reconnect_grace,
        );

        let controller = self.clone();
        let armed = ticket.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(armed.deadline).await;
            controller.expire(&armed).await;
        });
        world.pending.arm(&ticket, timer.abort_handle());

        tracing::info!(
            %client_id,
            %conn,
            %room_id,
            grace = ?self.config.reconnect_grace,
            in_grace = world.pending.len(),
            "client disconnected, grace period started"
        );
        Some(ticket)
    }

    /// Evicts a client whose grace period ran out without a reconnect.
    ///
    /// Runs at most once per grace period: if a connect cancelled it, or a
    /// newer disconnect replaced it, the ticket no longer matches and this
    /// is a no-op.
    async fn expire(&self, ticket: &GraceTicket) {
        let mut world = self.world.lock().await;
        let Some(entry) = world.pending.take_expired(ticket) else {
            return;
        };

        let client_id = entry.client_id;
        let room_id = world
            .clients
            .remove(&client_id)
            .map(|c| c.room_id)
            .unwrap_or(entry.room_id);

        match world.rooms.leave(&room_id, &client_id) {
            Ok(emptied) => tracing::info!(
                %client_id,
                %room_id,
                room_removed = emptied,
                known_clients = world.clients.len(),
                "grace period elapsed, client evicted"
            ),
            Err(e) => tracing::warn!(
                %client_id,
                error = %e,
                "evicted client was not in its room"
            ),
        }
    }

    /// Routes one decoded client event. Returns how many connections the
    /// resulting broadcast reached.
    pub async fn handle_event(
        &self,
        conn: ConnectionId,
        event: ClientEvent,
    ) -> Result<usize, PlazaError> {
        match event {
            ClientEvent::Chat(req) => self.chat(conn, req).await,
            ClientEvent::Movement(req) => self.movement(conn, req).await,
        }
    }

    /// Relays a chat line to every member of the sender's room, sender
    /// included.
    ///
    /// # Errors
    /// - [`SessionError::UnknownConnection`] if `conn` has no client
    /// - [`SessionError::InvalidPayload`] if the message is absent or empty
    pub async fn chat(
        &self,
        conn: ConnectionId,
        req: ChatRequest,
    ) -> Result<usize, PlazaError> {
        let world = self.world.lock().await;

        let client_id = world
            .registry
            .client_of(conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let message = req
            .message
            .filter(|m| !m.is_empty())
            .ok_or(SessionError::InvalidPayload("message"))?;
        let client = world
            .clients
            .get(client_id)
            .ok_or_else(|| SessionError::UnknownClient(client_id.clone()))?;

        let event = ServerEvent::Chat(ChatMessage {
            user_name: client.user_name.clone(),
            message,
        });
        Ok(world.broadcaster.deliver(
            &event,
            &client.room_id,
            &Target::AllMembers,
            &world.rooms,
            &world.registry,
        ))
    }

    /// Records a movement and relays the new snapshot to every member of
    /// the mover's room, mover included.
    ///
    /// An absent `direction` keeps the stored one.
    ///
    /// # Errors
    /// - [`SessionError::UnknownConnection`] if `conn` has no client
    /// - [`SessionError::InvalidPayload`] if either coordinate is absent;
    ///   the stored state is left untouched
    pub async fn movement(
        &self,
        conn: ConnectionId,
        req: MovementRequest,
    ) -> Result<usize, PlazaError> {
        let mut world = self.world.lock().await;
        let World {
            registry,
            clients,
            rooms,
            broadcaster,
            ..
        } = &mut *world;

        let client_id = registry
            .client_of(conn)
            .cloned()
            .ok_or(SessionError::UnknownConnection(conn))?;
        let (Some(x), Some(y)) = (req.position_x, req.position_y) else {
            return Err(SessionError::InvalidPayload("position_x/position_y").into());
        };

        let client = clients.apply_movement(&client_id, x, y, req.direction)?;
        let event = ServerEvent::MovementInfo(client.snapshot(&client_id));
        Ok(broadcaster.deliver(
            &event,
            &client.room_id,
            &Target::AllMembers,
            rooms,
            registry,
        ))
    }

    // -- Inspection --------------------------------------------------------

    /// A copy of a client's stored state.
    pub async fn client(&self, client_id: &ClientId) -> Option<Client> {
        self.world.lock().await.clients.get(client_id).cloned()
    }

    /// A room's members in join order.
    pub async fn members(&self, room_id: &RoomId) -> Vec<ClientId> {
        self.world.lock().await.rooms.members(room_id).to_vec()
    }

    /// Returns `true` if the client is inside a grace period.
    pub async fn is_pending(&self, client_id: &ClientId) -> bool {
        self.world.lock().await.pending.is_pending(client_id)
    }

    /// The client's live connection, if any.
    pub async fn connection_of(
        &self,
        client_id: &ClientId,
    ) -> Option<ConnectionId> {
        self.world.lock().await.registry.connection_of(client_id)
    }

    /// Number of rooms that currently exist.
    pub async fn room_count(&self) -> usize {
        self.world.lock().await.rooms.room_count()
    }
}
