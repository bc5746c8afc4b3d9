//! Socket link state machine.
//!
//! Manages one Socket.IO namespace connection over a WebSocket that the driver
//! has already opened: the Engine.IO handshake, the namespace CONNECT carrying
//! auth, heartbeats and timeouts. Uses the action pattern: methods take time
//! as input and return actions for the driver to execute.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐  open   ┌─────────┐  CONNECT ack  ┌───────────┐
//! │ Opening │────────>│ Joining │──────────────>│ Connected │
//! └─────────┘         └─────────┘               └───────────┘
//!      │                   │                          │
//!      │ timeout/close     │ CONNECT_ERROR/timeout    │ close/DISCONNECT/heartbeat
//!      ↓                   ↓                          ↓
//!                     ┌────────┐
//!                     │ Closed │
//!                     └────────┘
//! ```
//!
//! The server drives heartbeats: it pings every `pingInterval` and expects a
//! pong within `pingTimeout`. The link answers every ping and closes itself
//! when nothing arrives for `pingInterval + pingTimeout`.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use annochat_proto::{Packet, SocketPacket};
use serde_json::Value;

use crate::error::ConnectionError;

/// Time allowed from socket open to namespace CONNECT ack.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

/// Actions returned by the link state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Write this packet to the WebSocket.
    Send(Packet),

    /// Namespace CONNECT acknowledged. Events may now flow.
    Connected,

    /// Event received on our namespace.
    Deliver {
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
    },

    /// Server refused the namespace connect.
    Rejected {
        /// Rejection payload, usually `{message}`.
        data: Option<Value>,
    },

    /// Close the WebSocket.
    Close {
        /// Reason for closing.
        reason: String,
    },
}

/// Link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// WebSocket open, waiting for the Engine.IO handshake.
    Opening,
    /// Namespace CONNECT sent, waiting for the ack.
    Joining,
    /// Namespace connected.
    Connected,
    /// Link closed (graceful, rejected or timed out).
    Closed,
}

/// Link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Timeout from socket open to namespace CONNECT ack.
    pub handshake_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT }
    }
}

/// Socket.IO namespace link.
///
/// Pure state machine - no I/O. Generic over `Instant` to support both real
/// time and virtual time for deterministic testing.
#[derive(Debug, Clone)]
pub struct Link<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    state: LinkState,
    config: LinkConfig,
    namespace: String,
    /// Auth object for the namespace CONNECT. Taken when sent.
    auth: Option<Value>,
    last_activity: I,
    /// `pingInterval + pingTimeout` from the handshake.
    heartbeat_timeout: Option<Duration>,
    /// Engine.IO session id.
    engine_sid: Option<String>,
    /// Socket.IO session id for our namespace.
    socket_sid: Option<String>,
}

impl<I> Link<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a link for a freshly opened WebSocket.
    pub fn new(now: I, namespace: impl Into<String>, auth: Option<Value>, config: LinkConfig) -> Self {
        Self {
            state: LinkState::Opening,
            config,
            namespace: namespace.into(),
            auth,
            last_activity: now,
            heartbeat_timeout: None,
            engine_sid: None,
            socket_sid: None,
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Namespace this link connects to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Engine.IO session id. `None` before the handshake.
    pub fn engine_sid(&self) -> Option<&str> {
        self.engine_sid.as_deref()
    }

    /// Socket.IO session id. `None` until the namespace is connected.
    pub fn socket_sid(&self) -> Option<&str> {
        self.socket_sid.as_deref()
    }

    /// Process an inbound packet.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::UnexpectedPacket` if the packet is invalid for the
    ///   current state. The link state is unchanged.
    pub fn handle_packet(
        &mut self,
        packet: Packet,
        now: I,
    ) -> Result<Vec<LinkAction>, ConnectionError> {
        if self.state == LinkState::Closed {
            return Ok(vec![]);
        }
        self.last_activity = now;

        match (self.state, packet) {
            (_, Packet::Ping(data)) => Ok(vec![LinkAction::Send(Packet::Pong(data))]),
            (_, Packet::Pong(_) | Packet::Noop | Packet::Upgrade) => Ok(vec![]),
            (_, Packet::Close) => Ok(self.close("server closed transport")),

            (LinkState::Opening, Packet::Open(handshake)) => {
                self.heartbeat_timeout = Some(Duration::from_millis(
                    handshake.ping_interval.saturating_add(handshake.ping_timeout),
                ));
                self.engine_sid = Some(handshake.sid);
                self.state = LinkState::Joining;

                let connect =
                    SocketPacket::Connect { namespace: self.namespace.clone(), data: self.auth.take() };
                Ok(vec![LinkAction::Send(Packet::Message(connect))])
            },
            (state, Packet::Open(_)) => {
                Err(ConnectionError::UnexpectedPacket { state, packet: "open" })
            },
            (state @ LinkState::Opening, Packet::Message(_)) => {
                Err(ConnectionError::UnexpectedPacket { state, packet: "message" })
            },

            (state, Packet::Message(packet)) => {
                if packet.namespace() != self.namespace {
                    return Ok(vec![]);
                }
                self.handle_socket_packet(state, packet)
            },
        }
    }

    fn handle_socket_packet(
        &mut self,
        state: LinkState,
        packet: SocketPacket,
    ) -> Result<Vec<LinkAction>, ConnectionError> {
        match (state, packet) {
            (LinkState::Joining, SocketPacket::Connect { data, .. }) => {
                self.socket_sid =
                    data.as_ref().and_then(|d| d.get("sid")).and_then(Value::as_str).map(str::to_owned);
                self.state = LinkState::Connected;
                Ok(vec![LinkAction::Connected])
            },
            (_, SocketPacket::Connect { .. }) => Ok(vec![]),

            (_, SocketPacket::ConnectError { data, .. }) => {
                self.state = LinkState::Closed;
                Ok(vec![LinkAction::Rejected { data }])
            },

            (LinkState::Connected, SocketPacket::Event { name, args, .. }) => {
                Ok(vec![LinkAction::Deliver { name, args }])
            },
            (state, SocketPacket::Event { .. }) => {
                Err(ConnectionError::UnexpectedPacket { state, packet: "event" })
            },

            (_, SocketPacket::Disconnect { .. }) => Ok(self.close("server disconnected namespace")),

            // We never request acknowledgements.
            (_, SocketPacket::Ack { .. }) => Ok(vec![]),
        }
    }

    /// Build an EVENT packet for our namespace.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` unless connected.
    pub fn emit(&self, name: &str, args: Vec<Value>) -> Result<Packet, ConnectionError> {
        if self.state != LinkState::Connected {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "emit" });
        }
        Ok(Packet::Message(SocketPacket::event(self.namespace.clone(), name, args)))
    }

    /// Leave the namespace and close. Idempotent.
    pub fn disconnect(&mut self) -> Vec<LinkAction> {
        match self.state {
            LinkState::Closed => vec![],
            LinkState::Connected => {
                self.state = LinkState::Closed;
                let disconnect = SocketPacket::Disconnect { namespace: self.namespace.clone() };
                vec![
                    LinkAction::Send(Packet::Message(disconnect)),
                    LinkAction::Close { reason: "client disconnect".into() },
                ]
            },
            LinkState::Opening | LinkState::Joining => {
                self.close("client disconnect")
            },
        }
    }

    /// Timeout error if the link has been silent for too long. `None`
    /// otherwise.
    pub fn check_timeout(&self, now: I) -> Option<ConnectionError> {
        let elapsed = now - self.last_activity;
        match self.state {
            LinkState::Opening | LinkState::Joining if elapsed > self.config.handshake_timeout => {
                Some(ConnectionError::HandshakeTimeout { elapsed })
            },
            LinkState::Connected => match self.heartbeat_timeout {
                Some(timeout) if elapsed > timeout => {
                    Some(ConnectionError::HeartbeatTimeout { elapsed })
                },
                _ => None,
            },
            _ => None,
        }
    }

    /// Process periodic maintenance (timeout detection).
    pub fn tick(&mut self, now: I) -> Vec<LinkAction> {
        match self.check_timeout(now) {
            Some(err) => self.close(&err.to_string()),
            None => vec![],
        }
    }

    fn close(&mut self, reason: &str) -> Vec<LinkAction> {
        self.state = LinkState::Closed;
        vec![LinkAction::Close { reason: reason.to_owned() }]
    }
}
