//! The client directory: mutable per-client state.

use std::collections::HashMap;

use plaza_protocol::{ClientId, MovementInfo, RoomId};

use crate::SessionError;

/// Where a brand-new client appears.
pub const DEFAULT_POSITION_X: f64 = 500.0;
pub const DEFAULT_POSITION_Y: f64 = 500.0;
/// Which way a brand-new client faces.
pub const DEFAULT_DIRECTION: f64 = 1.0;
/// Placeholder sprite until clients pick their own.
pub const DEFAULT_SPRITE: &str = "img_url";

/// Everything the server remembers about one client.
///
/// Survives a disconnect for the length of the grace period. Position and
/// direction are only ever changed by movement events.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub room_id: RoomId,
    pub user_name: Option<String>,
    /// Opaque; stored as received.
    pub room_type: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub direction: f64,
    pub sprite: String,
}

impl Client {
    /// A fresh client at the default position.
    pub fn new(
        room_id: RoomId,
        user_name: Option<String>,
        room_type: Option<String>,
    ) -> Self {
        Self {
            room_id,
            user_name,
            room_type,
            position_x: DEFAULT_POSITION_X,
            position_y: DEFAULT_POSITION_Y,
            direction: DEFAULT_DIRECTION,
            sprite: DEFAULT_SPRITE.to_owned(),
        }
    }

    /// This client's presence snapshot, as sent to peers.
    pub fn snapshot(&self, client_id: &ClientId) -> MovementInfo {
        MovementInfo {
            client_id: client_id.clone(),
            user_name: self.user_name.clone(),
            position_x: self.position_x,
            position_y: self.position_y,
            direction: self.direction,
        }
    }
}

/// What [`ClientDirectory::upsert`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// No entry existed; one was created with defaults.
    Created,
    /// An entry existed; its position and direction were kept.
    /// `previous_room` is the room it was in before this upsert.
    Resumed { previous_room: RoomId },
}

/// All known clients, keyed by [`ClientId`]. One entry per id, ever.
#[derive(Debug, Default)]
pub struct ClientDirectory {
    clients: HashMap<ClientId, Client>,
}

impl ClientDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or refreshes a client's entry.
    ///
    /// Room, display name, and room type always take the incoming values.
    /// Position and direction are kept for an existing entry, so a client
    /// that comes back within its grace period resumes where it was.
    pub fn upsert(
        &mut self,
        client_id: &ClientId,
        room_id: RoomId,
        user_name: Option<String>,
        room_type: Option<String>,
    ) -> Upsert {
        match self.clients.get_mut(client_id) {
            Some(client) => {
                let previous_room =
                    std::mem::replace(&mut client.room_id, room_id);
                client.user_name = user_name;
                client.room_type = room_type;
                Upsert::Resumed { previous_room }
            }
            None => {
                self.clients.insert(
                    client_id.clone(),
                    Client::new(room_id, user_name, room_type),
                );
                Upsert::Created
            }
        }
    }

    /// Records a movement. `direction: None` keeps the stored direction.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownClient`] if there is no entry.
    pub fn apply_movement(
        &mut self,
        client_id: &ClientId,
        position_x: f64,
        position_y: f64,
        direction: Option<f64>,
    ) -> Result<&Client, SessionError> {
        let client = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| SessionError::UnknownClient(client_id.clone()))?;

        client.position_x = position_x;
        client.position_y = position_y;
        if let Some(direction) = direction {
            client.direction = direction;
        }
        Ok(client)
    }

    /// Looks up a client.
    pub fn get(&self, client_id: &ClientId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// Deletes a client's entry, returning it.
    pub fn remove(&mut self, client_id: &ClientId) -> Option<Client> {
        self.clients.remove(client_id)
    }

    /// Number of known clients (connected or in grace).
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are known.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    fn room(s: &str) -> RoomId {
        RoomId::from(s)
    }

    #[test]
    fn test_upsert_new_client_applies_defaults() {
        let mut dir = ClientDirectory::new();

        let outcome =
            dir.upsert(&cid("a"), room("r1"), Some("Alice".into()), None);

        assert_eq!(outcome, Upsert::Created);
        let client = dir.get(&cid("a")).unwrap();
        assert_eq!(client.position_x, 500.0);
        assert_eq!(client.position_y, 500.0);
        assert_eq!(client.direction, 1.0);
        assert_eq!(client.sprite, "img_url");
        assert_eq!(client.user_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_upsert_existing_client_keeps_position_refreshes_profile() {
        let mut dir = ClientDirectory::new();
        dir.upsert(&cid("a"), room("r1"), Some("Alice".into()), None);
        dir.apply_movement(&cid("a"), 600.0, 450.0, Some(2.0)).unwrap();

        let outcome = dir.upsert(
            &cid("a"),
            room("r2"),
            Some("Alicia".into()),
            Some("lobby".into()),
        );

        assert_eq!(
            outcome,
            Upsert::Resumed {
                previous_room: room("r1")
            }
        );
        let client = dir.get(&cid("a")).unwrap();
        assert_eq!((client.position_x, client.position_y), (600.0, 450.0));
        assert_eq!(client.direction, 2.0);
        assert_eq!(client.room_id, room("r2"));
        assert_eq!(client.user_name.as_deref(), Some("Alicia"));
        assert_eq!(client.room_type.as_deref(), Some("lobby"));
    }

    #[test]
    fn test_apply_movement_without_direction_keeps_direction() {
        let mut dir = ClientDirectory::new();
        dir.upsert(&cid("a"), room("r1"), None, None);
        dir.apply_movement(&cid("a"), 1.0, 2.0, Some(3.0)).unwrap();

        let client = dir.apply_movement(&cid("a"), 10.0, 20.0, None).unwrap();

        assert_eq!((client.position_x, client.position_y), (10.0, 20.0));
        assert_eq!(client.direction, 3.0);
    }

    #[test]
    fn test_apply_movement_unknown_client_returns_error() {
        let mut dir = ClientDirectory::new();

        let result = dir.apply_movement(&cid("ghost"), 1.0, 1.0, None);

        assert!(matches!(result, Err(SessionError::UnknownClient(_))));
    }

    #[test]
    fn test_remove_then_upsert_starts_fresh() {
        let mut dir = ClientDirectory::new();
        dir.upsert(&cid("a"), room("r1"), None, None);
        dir.apply_movement(&cid("a"), 9.0, 9.0, Some(4.0)).unwrap();

        assert!(dir.remove(&cid("a")).is_some());
        let outcome = dir.upsert(&cid("a"), room("r1"), None, None);

        assert_eq!(outcome, Upsert::Created);
        assert_eq!(dir.get(&cid("a")).unwrap().position_x, 500.0);
    }

    #[test]
    fn test_snapshot_carries_identity_and_position() {
        let client = Client::new(room("r1"), Some("Bob".into()), None);
        let snap = client.snapshot(&cid("b"));

        assert_eq!(snap.client_id, cid("b"));
        assert_eq!(snap.user_name.as_deref(), Some("Bob"));
        assert_eq!(snap.position_x, 500.0);
        assert_eq!(snap.direction, 1.0);
    }
}
