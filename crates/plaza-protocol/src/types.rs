//! Identity types and handshake parameters.
//!
//! A client is known by two names on the server:
//! - its [`ClientId`], chosen by the client and stable across reconnects
//! - its connection id, assigned by the transport and new on every socket
//!
//! This module only deals with the first. The transport layer owns the second.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The durable identity of a logical participant.
///
/// Supplied by the client in the handshake query and opaque to the server.
/// The same `ClientId` presented again within the grace period resumes the
/// previous presence (room membership and position) instead of starting over.
///
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// The name of a room: a group of clients that see each other's updates.
///
/// Rooms are created lazily the first time someone joins them, so any
/// non-empty string is a valid room id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// ConnectParams: what the handshake carries
// ---------------------------------------------------------------------------

/// The raw query string fields, before validation.
///
/// Every field is optional here so a missing key produces a precise
/// [`ProtocolError::MissingParam`] instead of a generic decode error.
#[derive(Debug, Default, Deserialize)]
struct RawConnectQuery {
    client_id: Option<String>,
    user_name: Option<String>,
    room_type: Option<String>,
    room_id: Option<String>,
}

/// Validated handshake parameters for a new connection.
///
/// Built from the query string of the WebSocket upgrade request, e.g.
/// `/?client_id=alice&user_name=Alice&room_type=lobby&room_id=r1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Required, non-empty.
    pub client_id: ClientId,
    /// Optional display name. Relayed to peers as `user_name`.
    pub user_name: Option<String>,
    /// Opaque to the server; stored and never interpreted.
    pub room_type: Option<String>,
    /// Required, non-empty.
    pub room_id: RoomId,
}

impl ConnectParams {
    /// Parses and validates a handshake query string.
    ///
    /// `None` (no `?` in the request URI) is treated like an empty query.
    ///
    /// # Errors
    /// - [`ProtocolError::MissingParam`] if `client_id` or `room_id` is
    ///   absent or empty
    /// - [`ProtocolError::InvalidQuery`] if the query is not valid
    ///   `application/x-www-form-urlencoded`
    pub fn from_query(query: Option<&str>) -> Result<Self, ProtocolError> {
        let raw: RawConnectQuery = match query {
            Some(q) => serde_urlencoded::from_str(q)
                .map_err(|e| ProtocolError::InvalidQuery(e.to_string()))?,
            None => RawConnectQuery::default(),
        };

        let client_id = raw
            .client_id
            .filter(|s| !s.is_empty())
            .ok_or(ProtocolError::MissingParam("client_id"))?;
        let room_id = raw
            .room_id
            .filter(|s| !s.is_empty())
            .ok_or(ProtocolError::MissingParam("room_id"))?;

        Ok(Self {
            client_id: ClientId(client_id),
            user_name: raw.user_name,
            room_type: raw.room_type,
            room_id: RoomId(room_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientId::from("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId::from("r1").to_string(), "r1");
    }

    #[test]
    fn test_from_query_all_fields() {
        let params = ConnectParams::from_query(Some(
            "client_id=alice&user_name=Alice&room_type=lobby&room_id=r1",
        ))
        .expect("should parse");

        assert_eq!(params.client_id, ClientId::from("alice"));
        assert_eq!(params.user_name.as_deref(), Some("Alice"));
        assert_eq!(params.room_type.as_deref(), Some("lobby"));
        assert_eq!(params.room_id, RoomId::from("r1"));
    }

    #[test]
    fn test_from_query_decodes_percent_escapes() {
        let params = ConnectParams::from_query(Some(
            "client_id=a%20b&user_name=%EA%B9%80&room_id=r+1",
        ))
        .unwrap();

        assert_eq!(params.client_id.as_str(), "a b");
        assert_eq!(params.user_name.as_deref(), Some("김"));
        assert_eq!(params.room_id.as_str(), "r 1");
    }

    #[test]
    fn test_from_query_optional_fields_absent() {
        let params =
            ConnectParams::from_query(Some("client_id=a&room_id=r1")).unwrap();
        assert!(params.user_name.is_none());
        assert!(params.room_type.is_none());
    }

    #[test]
    fn test_from_query_missing_client_id_rejected() {
        let result = ConnectParams::from_query(Some("room_id=r1"));
        assert!(matches!(
            result,
            Err(ProtocolError::MissingParam("client_id"))
        ));
    }

    #[test]
    fn test_from_query_empty_room_id_rejected() {
        let result = ConnectParams::from_query(Some("client_id=a&room_id="));
        assert!(matches!(result, Err(ProtocolError::MissingParam("room_id"))));
    }

    #[test]
    fn test_from_query_none_rejected() {
        let result = ConnectParams::from_query(None);
        assert!(matches!(
            result,
            Err(ProtocolError::MissingParam("client_id"))
        ));
    }

    #[test]
    fn test_from_query_ignores_unknown_keys() {
        let params = ConnectParams::from_query(Some(
            "EIO=4&transport=websocket&client_id=a&room_id=r1",
        ))
        .unwrap();
        assert_eq!(params.client_id.as_str(), "a");
    }
}
