//! AnnoChat wire protocol
//!
//! The chat and presence services speak Socket.IO (protocol v5) over
//! Engine.IO (protocol v4) on a plain WebSocket. Every WebSocket text message
//! is one Engine.IO [`Packet`]; Engine.IO `message` packets carry one
//! Socket.IO [`SocketPacket`].
//!
//! On top of the framing, [`ServerEvent`], [`ClientEvent`] and
//! [`PresenceUpdate`] give the events the client understands a typed shape.
//!
//! # Invariants
//!
//! - Decoding never panics. Malformed input returns [`ProtocolError`].
//! - Every [`ClientEvent`] encodes to exactly one EVENT packet.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
mod events;
mod packet;

pub use errors::{ProtocolError, Result};
pub use events::{ClientEvent, PresenceUpdate, RoomId, ServerEvent};
pub use packet::{Handshake, Packet, ROOT_NAMESPACE, SocketPacket};
