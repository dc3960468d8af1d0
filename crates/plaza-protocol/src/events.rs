//! Named events exchanged over a connection.
//!
//! Every frame is a JSON object with an event name and a data object:
//!
//! ```text
//! { "event": "CS_MOVEMENT_INFO", "data": { "position_x": 600, "position_y": 450 } }
//! ```
//!
//! `#[serde(tag = "event", content = "data")]` gives exactly that
//! "adjacently tagged" shape, and `#[serde(rename = ...)]` maps each variant
//! to its wire name.

use serde::{Deserialize, Serialize};

use crate::ClientId;

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Payload of `CS_CHAT`.
///
/// `message` is optional at the decode level: an absent or empty message is
/// a well-formed frame that the server chooses to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of `CS_MOVEMENT_INFO`.
///
/// Both coordinates are required for the event to take effect, but they are
/// decoded as options so the server can log and drop instead of failing the
/// whole frame. An absent `direction` keeps the client's stored direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementRequest {
    #[serde(default)]
    pub position_x: Option<f64>,
    #[serde(default)]
    pub position_y: Option<f64>,
    #[serde(default)]
    pub direction: Option<f64>,
}

/// Events a client may send after the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "CS_CHAT")]
    Chat(ChatRequest),

    #[serde(rename = "CS_MOVEMENT_INFO")]
    Movement(MovementRequest),
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat(_) => "CS_CHAT",
            Self::Movement(_) => "CS_MOVEMENT_INFO",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A presence snapshot: where a client is and which way it faces.
///
/// Sent for every movement and, on join, once per room member to bring the
/// newcomer up to date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementInfo {
    pub client_id: ClientId,
    pub user_name: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub direction: f64,
}

/// A chat line relayed to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_name: Option<String>,
    pub message: String,
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "SC_MOVEMENT_INFO")]
    MovementInfo(MovementInfo),

    #[serde(rename = "SC_CHAT")]
    Chat(ChatMessage),
}

impl ServerEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MovementInfo(_) => "SC_MOVEMENT_INFO",
            Self::Chat(_) => "SC_CHAT",
        }
    }
}

#[cfg(test)]
mod tests {
    //! The client SDK parses these shapes directly, so the tests pin the
    //! JSON layout rather than round-tripping through our own types.

    use super::*;

    #[test]
    fn test_server_movement_info_json_format() {
        let event = ServerEvent::MovementInfo(MovementInfo {
            client_id: ClientId::from("a"),
            user_name: Some("Alice".into()),
            position_x: 600.0,
            position_y: 450.0,
            direction: 2.0,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "SC_MOVEMENT_INFO");
        assert_eq!(json["data"]["client_id"], "a");
        assert_eq!(json["data"]["user_name"], "Alice");
        assert_eq!(json["data"]["position_x"].as_f64(), Some(600.0));
        assert_eq!(json["data"]["position_y"].as_f64(), Some(450.0));
        assert_eq!(json["data"]["direction"].as_f64(), Some(2.0));
    }

    #[test]
    fn test_server_chat_without_user_name_is_null() {
        let event = ServerEvent::Chat(ChatMessage {
            user_name: None,
            message: "hi".into(),
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "SC_CHAT");
        assert!(json["data"]["user_name"].is_null());
        assert_eq!(json["data"]["message"], "hi");
    }

    #[test]
    fn test_client_movement_accepts_integers() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"CS_MOVEMENT_INFO","data":{"position_x":600,"position_y":450,"direction":2}}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::Movement(MovementRequest {
                position_x: Some(600.0),
                position_y: Some(450.0),
                direction: Some(2.0),
            })
        );
    }

    #[test]
    fn test_client_movement_missing_fields_decode_as_none() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"CS_MOVEMENT_INFO","data":{"position_x":1}}"#,
        )
        .unwrap();

        let ClientEvent::Movement(req) = event else {
            panic!("expected movement");
        };
        assert_eq!(req.position_x, Some(1.0));
        assert!(req.position_y.is_none());
        assert!(req.direction.is_none());
    }

    #[test]
    fn test_client_chat_missing_message_decodes_as_none() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"CS_CHAT","data":{}}"#).unwrap();
        assert_eq!(event, ClientEvent::Chat(ChatRequest { message: None }));
    }

    #[test]
    fn test_client_event_unknown_name_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"CS_DANCE","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_event_non_object_data_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"CS_CHAT","data":"hello"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ClientEvent::Chat(ChatRequest::default()).name(), "CS_CHAT");
        assert_eq!(
            ServerEvent::Chat(ChatMessage {
                user_name: None,
                message: String::new()
            })
            .name(),
            "SC_CHAT"
        );
    }
}
