//! Engine.IO and Socket.IO packet framing.
//!
//! Engine.IO packets are a single ASCII type digit followed by data. Socket.IO
//! packets travel inside Engine.IO `message` packets and add a namespace, an
//! optional acknowledgement id and a JSON body:
//!
//! ```text
//! 4 2 /presence, 12 ["onlineUsers",5]
//! │ │ │          │  └─ JSON body
//! │ │ │          └──── ack id (optional)
//! │ │ └─────────────── namespace (omitted for "/")
//! │ └───────────────── Socket.IO type (EVENT)
//! └─────────────────── Engine.IO type (message)
//! ```
//!
//! Binary attachments (Socket.IO types 5 and 6) are not used by the chat
//! service and are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// The default Socket.IO namespace.
pub const ROOT_NAMESPACE: &str = "/";

/// Engine.IO open handshake sent by the server as the first packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the server offers to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Engine.IO packet. One per WebSocket text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Handshake, first packet from the server.
    Open(Handshake),
    /// Transport close.
    Close,
    /// Heartbeat probe. The data is echoed by the pong.
    Ping(String),
    /// Heartbeat reply.
    Pong(String),
    /// Socket.IO payload.
    Message(SocketPacket),
    /// Transport upgrade (polling only, never sent over WebSocket).
    Upgrade,
    /// No-op.
    Noop,
}

impl Packet {
    /// Decode one Engine.IO packet from a WebSocket text message.
    pub fn decode(text: &str) -> Result<Self> {
        let (kind, rest) = split_type(text)?;
        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(rest.to_owned())),
            '3' => Ok(Self::Pong(rest.to_owned())),
            '4' => Ok(Self::Message(SocketPacket::decode(rest)?)),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(ProtocolError::Malformed(format!("unknown engine packet type {other:?}"))),
        }
    }

    /// Encode to WebSocket text.
    pub fn encode(&self) -> Result<String> {
        let text = match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_owned(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(packet) => format!("4{}", packet.encode()?),
            Self::Upgrade => "5".to_owned(),
            Self::Noop => "6".to_owned(),
        };
        Ok(text)
    }
}

/// Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPacket {
    /// Namespace connect. Client sends auth data, server replies with `{sid}`.
    Connect {
        /// Target namespace.
        namespace: String,
        /// Auth object (client) or connect ack (server).
        data: Option<Value>,
    },

    /// Namespace disconnect.
    Disconnect {
        /// Target namespace.
        namespace: String,
    },

    /// Named event with arguments.
    Event {
        /// Target namespace.
        namespace: String,
        /// Acknowledgement id requested by the sender.
        id: Option<u64>,
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
    },

    /// Acknowledgement of an earlier event.
    Ack {
        /// Target namespace.
        namespace: String,
        /// Id of the acknowledged event.
        id: u64,
        /// Acknowledgement arguments.
        args: Vec<Value>,
    },

    /// Server refused the namespace connect.
    ConnectError {
        /// Target namespace.
        namespace: String,
        /// Rejection payload, usually `{message}`.
        data: Option<Value>,
    },
}

impl SocketPacket {
    /// Build an EVENT packet without an acknowledgement id.
    pub fn event(namespace: impl Into<String>, name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event { namespace: namespace.into(), id: None, name: name.into(), args }
    }

    /// Namespace this packet targets.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decode the Socket.IO part of an Engine.IO message.
    pub fn decode(text: &str) -> Result<Self> {
        let (kind, rest) = split_type(text)?;

        let (namespace, rest) = match rest.strip_prefix('/') {
            Some(_) => match rest.find(',') {
                Some(comma) => (&rest[..comma], &rest[comma + 1..]),
                None => (rest, ""),
            },
            None => (ROOT_NAMESPACE, rest),
        };
        let namespace = namespace.to_owned();

        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (id, body) = rest.split_at(digits);
        let id = if id.is_empty() {
            None
        } else {
            Some(
                id.parse::<u64>()
                    .map_err(|e| ProtocolError::Malformed(format!("invalid ack id: {e}")))?,
            )
        };

        let data: Option<Value> =
            if body.is_empty() { None } else { Some(serde_json::from_str(body)?) };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let (name, args) = split_event(data)?;
                Ok(Self::Event { namespace, id, name, args })
            },
            '3' => {
                let id = id.ok_or_else(|| ProtocolError::Malformed("ack without id".into()))?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    None => Vec::new(),
                    Some(other) => {
                        return Err(ProtocolError::Malformed(format!(
                            "ack body must be an array, got {other}"
                        )));
                    },
                };
                Ok(Self::Ack { namespace, id, args })
            },
            '4' => Ok(Self::ConnectError { namespace, data }),
            '5' | '6' => Err(ProtocolError::UnsupportedPacket(kind)),
            other => Err(ProtocolError::Malformed(format!("unknown socket packet type {other:?}"))),
        }
    }

    /// Encode to the Socket.IO text form (without the Engine.IO prefix).
    pub fn encode(&self) -> Result<String> {
        let (kind, id, body) = match self {
            Self::Connect { data, .. } => ('0', None, data.clone()),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event { id, name, args, .. } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(items)))
            },
            Self::Ack { id, args, .. } => ('3', Some(*id), Some(Value::Array(args.clone()))),
            Self::ConnectError { data, .. } => ('4', None, data.clone()),
        };

        let mut out = String::new();
        out.push(kind);

        let namespace = self.namespace();
        if namespace != ROOT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(body) = body {
            out.push_str(&serde_json::to_string(&body)?);
        }
        Ok(out)
    }
}

/// Split off the leading ASCII type digit.
fn split_type(text: &str) -> Result<(char, &str)> {
    let mut chars = text.chars();
    match chars.next() {
        Some(kind) if kind.is_ascii_digit() => Ok((kind, chars.as_str())),
        Some(kind) => Err(ProtocolError::Malformed(format!("invalid packet type {kind:?}"))),
        None => Err(ProtocolError::Malformed("empty packet".into())),
    }
}

/// Split an EVENT body `[name, ...args]` into name and args.
fn split_event(data: Option<Value>) -> Result<(String, Vec<Value>)> {
    let Some(Value::Array(items)) = data else {
        return Err(ProtocolError::Malformed("event body must be an array".into()));
    };

    let mut items = items.into_iter();
    match items.next() {
        Some(Value::String(name)) => Ok((name, items.collect())),
        Some(other) => Err(ProtocolError::Malformed(format!("event name must be a string, got {other}"))),
        None => Err(ProtocolError::Malformed("event without a name".into())),
    }
}
