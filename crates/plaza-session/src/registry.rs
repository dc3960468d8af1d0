//! The connection registry: which live connection belongs to which client.
//!
//! This is the only place that knows both a client's durable id and the
//! transport's ephemeral connection id. Everything inbound is resolved
//! through [`ConnectionRegistry::client_of`]; everything outbound through
//! [`ConnectionRegistry::connection_of`].

use std::collections::HashMap;

use plaza_protocol::ClientId;
use plaza_transport::ConnectionId;

use crate::SessionError;

/// Bidirectional `ClientId ↔ ConnectionId` map.
///
/// Two `HashMap`s kept in lockstep, so lookups in either direction are
/// O(1). Invariants:
/// - a client is bound to at most one connection at a time
/// - a connection, once bound, is never bound to a different client
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_client: HashMap<ClientId, ConnectionId>,
    by_connection: HashMap<ConnectionId, ClientId>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `client_id` to `conn`.
    ///
    /// If the client was bound to another connection, that binding is
    /// replaced and the old connection is returned. The old connection stops
    /// resolving to anyone.
    ///
    /// # Errors
    /// Returns [`SessionError::ConnectionAlreadyBound`] if `conn` already
    /// belongs to a different client.
    pub fn bind(
        &mut self,
        client_id: ClientId,
        conn: ConnectionId,
    ) -> Result<Option<ConnectionId>, SessionError> {
        if let Some(owner) = self.by_connection.get(&conn) {
            if *owner != client_id {
                return Err(SessionError::ConnectionAlreadyBound(
                    conn,
                    owner.clone(),
                ));
            }
        }

        let replaced = self
            .by_client
            .insert(client_id.clone(), conn)
            .filter(|old| *old != conn);
        if let Some(old) = replaced {
            self.by_connection.remove(&old);
            tracing::debug!(%client_id, %old, new = %conn, "binding superseded");
        }
        self.by_connection.insert(conn, client_id);

        Ok(replaced)
    }

    /// Removes the binding for `conn`, returning the client it belonged to.
    ///
    /// `None` means the connection was never bound or has been superseded.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<ClientId> {
        let client_id = self.by_connection.remove(&conn)?;
        self.by_client.remove(&client_id);
        tracing::trace!(%client_id, %conn, "binding removed");
        Some(client_id)
    }

    /// Resolves a connection to its client.
    pub fn client_of(&self, conn: ConnectionId) -> Option<&ClientId> {
        self.by_connection.get(&conn)
    }

    /// Resolves a client to its live connection, if it has one.
    pub fn connection_of(&self, client_id: &ClientId) -> Option<ConnectionId> {
        self.by_client.get(client_id).copied()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.by_client.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }
}
