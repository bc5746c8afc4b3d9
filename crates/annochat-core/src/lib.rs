//! AnnoChat core
//!
//! Pieces shared by every layer above the wire format:
//!
//! - [`env::Environment`]: time source, so state machines run against a real
//!   clock in production and a virtual one in simulation.
//! - [`connection::Link`]: sans-IO state machine for one Socket.IO namespace
//!   over an open WebSocket (handshake, namespace auth, heartbeat).
//!
//! Both follow the action pattern: methods take time and inputs, and return
//! actions for the caller to execute. Nothing here performs I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;

pub use connection::{Link, LinkAction, LinkConfig, LinkState};
pub use error::ConnectionError;
