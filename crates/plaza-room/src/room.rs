//! The room index: which clients are in which room, in join order.

use std::collections::HashMap;

use plaza_protocol::{ClientId, RoomId};

use crate::RoomError;

/// Maps each room to its ordered member list.
///
/// Rooms come into existence on first join. Membership is a `Vec` rather
/// than a set because fan-out follows join order; duplicates are rejected
/// on insert, and rooms stay small enough that the linear `contains` is
/// cheaper than a second index.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<RoomId, Vec<ClientId>>,
}

impl RoomIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `room_id` exists. Returns `true` if it was just created.
    pub fn ensure(&mut self, room_id: &RoomId) -> bool {
        if self.rooms.contains_key(room_id) {
            return false;
        }
        self.rooms.insert(room_id.clone(), Vec::new());
        tracing::debug!(%room_id, "room created");
        true
    }

    /// Appends `client_id` to the room, creating the room if needed.
    ///
    /// Idempotent: returns `false` if the client was already a member.
    pub fn join(&mut self, room_id: &RoomId, client_id: &ClientId) -> bool {
        self.ensure(room_id);
        let members = self.rooms.entry(room_id.clone()).or_default();
        if members.contains(client_id) {
            return false;
        }
        members.push(client_id.clone());
        true
    }

    /// Removes `client_id` from the room. A room left empty is dropped
    /// from the index; the returned flag says whether that happened.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room doesn't exist
    /// - [`RoomError::NotMember`] if the client isn't in it
    pub fn leave(
        &mut self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<bool, RoomError> {
        let members = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let idx = members.iter().position(|m| m == client_id).ok_or_else(
            || RoomError::NotMember(client_id.clone(), room_id.clone()),
        )?;
        // `remove`, not `swap_remove`: join order must survive.
        members.remove(idx);

        if members.is_empty() {
            self.rooms.remove(room_id);
            tracing::debug!(%room_id, "empty room removed");
            return Ok(true);
        }
        Ok(false)
    }

    /// The room's members in join order. Empty if the room doesn't exist.
    pub fn members(&self, room_id: &RoomId) -> &[ClientId] {
        self.rooms.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if `client_id` is in `room_id`.
    pub fn contains(&self, room_id: &RoomId, client_id: &ClientId) -> bool {
        self.members(room_id).contains(client_id)
    }

    /// Number of rooms in the index.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
