//! Typed chat and presence events.
//!
//! The matchmaking server talks in named Socket.IO events with small JSON
//! object payloads. This module maps those names and payloads to enums so the
//! session state machine never touches raw JSON.
//!
//! | Direction | Event               | Payload                 |
//! |-----------|---------------------|-------------------------|
//! | in        | `matched`           | `{roomId}`              |
//! | in        | `chat message`      | `{msg}`                 |
//! | in        | `typing`            | `{isTyping}`            |
//! | in        | `user disconnected` | none                    |
//! | in        | `error`             | `{message}`             |
//! | out       | `join room`         | `roomId` (bare string)  |
//! | out       | `chat message`      | `{msg, roomId}`         |
//! | out       | `typing`            | `{roomId, isTyping}`    |
//! | presence  | `onlineUsers`       | count (number)          |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    SocketPacket,
    errors::{ProtocolError, Result},
};

const MATCHED: &str = "matched";
const CHAT_MESSAGE: &str = "chat message";
const TYPING: &str = "typing";
const USER_DISCONNECTED: &str = "user disconnected";
const ERROR: &str = "error";
const JOIN_ROOM: &str = "join room";
const ONLINE_USERS: &str = "onlineUsers";

/// Server-assigned room identifier.
///
/// Opaque to the client: it is only echoed back on outbound events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a server-provided id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id.
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
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Events the matchmaking server delivers on the chat connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Paired with a stranger.
    Matched {
        /// Room binding the two peers.
        room_id: RoomId,
    },

    /// Message from the stranger.
    ChatMessage {
        /// Message text.
        msg: String,
    },

    /// Stranger started or stopped typing.
    Typing {
        /// Whether the stranger is composing.
        is_typing: bool,
    },

    /// Stranger left the room.
    UserDisconnected,

    /// Server-side error, including handshake rejection.
    Error {
        /// Human-readable message. `None` when the payload carried no string
        /// `message` field.
        message: Option<String>,
    },
}

impl ServerEvent {
    /// Decode a named event received on the chat namespace.
    pub fn from_event(name: &str, args: &[Value]) -> Result<Self> {
        let first = args.first();
        match name {
            MATCHED => {
                let room_id = string_field(first, "roomId", MATCHED)?;
                Ok(Self::Matched { room_id: RoomId::new(room_id) })
            },
            CHAT_MESSAGE => Ok(Self::ChatMessage { msg: string_field(first, "msg", CHAT_MESSAGE)? }),
            TYPING => {
                let is_typing = first.and_then(|v| v.get("isTyping")).and_then(Value::as_bool);
                match is_typing {
                    Some(is_typing) => Ok(Self::Typing { is_typing }),
                    None => Err(ProtocolError::InvalidEvent {
                        event: TYPING,
                        reason: "missing boolean isTyping".into(),
                    }),
                }
            },
            USER_DISCONNECTED => Ok(Self::UserDisconnected),
            ERROR => Ok(Self::from_error_payload(first)),
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    /// Map a CONNECT_ERROR payload (handshake rejection) to an error event.
    pub fn from_connect_error(data: Option<&Value>) -> Self {
        Self::from_error_payload(data)
    }

    fn from_error_payload(payload: Option<&Value>) -> Self {
        let message =
            payload.and_then(|v| v.get("message")).and_then(Value::as_str).map(str::to_owned);
        Self::Error { message }
    }

    /// Socket.IO event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Matched { .. } => MATCHED,
            Self::ChatMessage { .. } => CHAT_MESSAGE,
            Self::Typing { .. } => TYPING,
            Self::UserDisconnected => USER_DISCONNECTED,
            Self::Error { .. } => ERROR,
        }
    }

    /// Event arguments as the server sends them.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::Matched { room_id } => vec![json!({ "roomId": room_id.as_str() })],
            Self::ChatMessage { msg } => vec![json!({ "msg": msg })],
            Self::Typing { is_typing } => vec![json!({ "isTyping": is_typing })],
            Self::UserDisconnected => Vec::new(),
            Self::Error { message: Some(message) } => vec![json!({ "message": message })],
            Self::Error { message: None } => vec![json!({})],
        }
    }

    /// EVENT packet carrying this event on the given namespace.
    pub fn to_packet(&self, namespace: &str) -> SocketPacket {
        SocketPacket::event(namespace, self.name(), self.args())
    }
}

/// Events the client emits on the chat connection.
///
/// Every variant is scoped to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Join the room the server matched us into.
    JoinRoom {
        /// Room to join.
        room_id: RoomId,
    },

    /// Send a message to the stranger.
    ChatMessage {
        /// Message text.
        msg: String,
        /// Room the message belongs to.
        room_id: RoomId,
    },

    /// Local typing state changed.
    Typing {
        /// Room the signal belongs to.
        room_id: RoomId,
        /// Whether we are composing.
        is_typing: bool,
    },
}

impl ClientEvent {
    /// Decode an event a client emitted (server side of the simulation).
    pub fn from_event(name: &str, args: &[Value]) -> Result<Self> {
        let first = args.first();
        match name {
            JOIN_ROOM => match first.and_then(Value::as_str) {
                Some(room_id) => Ok(Self::JoinRoom { room_id: RoomId::new(room_id) }),
                None => Err(ProtocolError::InvalidEvent {
                    event: JOIN_ROOM,
                    reason: "room id must be a string".into(),
                }),
            },
            CHAT_MESSAGE => Ok(Self::ChatMessage {
                msg: string_field(first, "msg", CHAT_MESSAGE)?,
                room_id: RoomId::new(string_field(first, "roomId", CHAT_MESSAGE)?),
            }),
            TYPING => {
                let room_id = RoomId::new(string_field(first, "roomId", TYPING)?);
                let is_typing = first.and_then(|v| v.get("isTyping")).and_then(Value::as_bool);
                match is_typing {
                    Some(is_typing) => Ok(Self::Typing { room_id, is_typing }),
                    None => Err(ProtocolError::InvalidEvent {
                        event: TYPING,
                        reason: "missing boolean isTyping".into(),
                    }),
                }
            },
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    /// Socket.IO event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => JOIN_ROOM,
            Self::ChatMessage { .. } => CHAT_MESSAGE,
            Self::Typing { .. } => TYPING,
        }
    }

    /// Event arguments as sent on the wire.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::JoinRoom { room_id } => vec![json!(room_id.as_str())],
            Self::ChatMessage { msg, room_id } => {
                vec![json!({ "msg": msg, "roomId": room_id.as_str() })]
            },
            Self::Typing { room_id, is_typing } => {
                vec![json!({ "roomId": room_id.as_str(), "isTyping": is_typing })]
            },
        }
    }

    /// Room this event is scoped to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinRoom { room_id }
            | Self::ChatMessage { room_id, .. }
            | Self::Typing { room_id, .. } => room_id,
        }
    }

    /// EVENT packet carrying this event on the given namespace.
    pub fn to_packet(&self, namespace: &str) -> SocketPacket {
        SocketPacket::event(namespace, self.name(), self.args())
    }
}

/// Events on the presence namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceUpdate {
    /// Number of users currently online.
    OnlineUsers(u64),
}

impl PresenceUpdate {
    /// Decode a named event received on the presence namespace.
    pub fn from_event(name: &str, args: &[Value]) -> Result<Self> {
        match name {
            ONLINE_USERS => match args.first().and_then(Value::as_u64) {
                Some(count) => Ok(Self::OnlineUsers(count)),
                None => Err(ProtocolError::InvalidEvent {
                    event: ONLINE_USERS,
                    reason: "count must be a non-negative integer".into(),
                }),
            },
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    /// EVENT packet carrying this update on the given namespace.
    pub fn to_packet(&self, namespace: &str) -> SocketPacket {
        match self {
            Self::OnlineUsers(count) => SocketPacket::event(namespace, ONLINE_USERS, vec![json!(count)]),
        }
    }
}

fn string_field(payload: Option<&Value>, field: &str, event: &'static str) -> Result<String> {
    payload
        .and_then(|v| v.get(field))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ProtocolError::InvalidEvent { event, reason: format!("missing string {field}") })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn matched_carries_room_id() {
        let event = ServerEvent::from_event("matched", &[json!({"roomId": "r1"})]).unwrap();
        assert_eq!(event, ServerEvent::Matched { room_id: "r1".into() });
    }

    #[test]
    fn matched_without_room_is_invalid() {
        let result = ServerEvent::from_event("matched", &[json!({})]);
        assert!(matches!(result, Err(ProtocolError::InvalidEvent { event: "matched", .. })));
    }

    #[test]
    fn user_disconnected_ignores_payload() {
        assert_eq!(
            ServerEvent::from_event("user disconnected", &[]).unwrap(),
            ServerEvent::UserDisconnected
        );
    }

    #[test]
    fn error_message_must_be_a_string() {
        let with_message =
            ServerEvent::from_event("error", &[json!({"message": "room full"})]).unwrap();
        assert_eq!(with_message, ServerEvent::Error { message: Some("room full".into()) });

        for payload in [json!({"message": 42}), json!("oops"), json!(null), json!({})] {
            let event = ServerEvent::from_event("error", &[payload]).unwrap();
            assert_eq!(event, ServerEvent::Error { message: None });
        }
        assert_eq!(
            ServerEvent::from_event("error", &[]).unwrap(),
            ServerEvent::Error { message: None }
        );
    }

    #[test]
    fn unknown_event_is_reported() {
        assert_eq!(
            ServerEvent::from_event("dance", &[]),
            Err(ProtocolError::UnknownEvent("dance".into()))
        );
    }

    #[test]
    fn join_room_sends_bare_room_id() {
        let event = ClientEvent::JoinRoom { room_id: "r1".into() };
        assert_eq!(event.args(), vec![json!("r1")]);
        assert_eq!(event.name(), "join room");
    }

    #[test]
    fn chat_message_is_room_scoped() {
        let event = ClientEvent::ChatMessage { msg: "hi".into(), room_id: "r1".into() };
        assert_eq!(event.args(), vec![json!({"msg": "hi", "roomId": "r1"})]);
        assert_eq!(event.room_id().as_str(), "r1");
    }

    #[test]
    fn client_events_decode_from_their_own_args() {
        let events = [
            ClientEvent::JoinRoom { room_id: "r1".into() },
            ClientEvent::ChatMessage { msg: "hi".into(), room_id: "r1".into() },
            ClientEvent::Typing { room_id: "r1".into(), is_typing: true },
        ];
        for event in events {
            assert_eq!(ClientEvent::from_event(event.name(), &event.args()).unwrap(), event);
        }
    }

    #[test]
    fn online_users_rejects_negative_and_fractional_counts() {
        assert_eq!(
            PresenceUpdate::from_event("onlineUsers", &[json!(7)]).unwrap(),
            PresenceUpdate::OnlineUsers(7)
        );
        for bad in [json!(-1), json!(2.5), json!("7"), json!(null)] {
            assert!(PresenceUpdate::from_event("onlineUsers", &[bad]).is_err());
        }
    }

    #[test]
    fn connect_error_maps_to_error_event() {
        let data = json!({"message": "invalid token"});
        assert_eq!(ServerEvent::from_connect_error(Some(&data)), ServerEvent::Error {
            message: Some("invalid token".into())
        });
    }
}
