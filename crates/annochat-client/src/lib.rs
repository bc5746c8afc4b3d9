//! Client
//!
//! Production I/O for the AnnoChat runtime: configuration, the system clock,
//! and (with the `transport` feature) the WebSocket transport and the HTTP
//! token provider.
//!
//! # Architecture
//!
//! Protocol logic lives in the sans-IO [`annochat_core::Link`] and the
//! [`annochat_app`] state machines. This crate only moves bytes and time:
//!
//! - [`SystemEnv`]: `std::time::Instant` clock and tokio sleeps
//! - [`ClientConfig`]: server, namespace and token endpoint settings
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: Socket.IO namespace over a WebSocket
//! - [`HttpTokenProvider`]: token endpoint client

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod system_env;

#[cfg(feature = "transport")]
mod token;
#[cfg(feature = "transport")]
pub mod transport;

pub use config::{
    ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PRESENCE_NAMESPACE, DEFAULT_SERVER_URL,
    DEFAULT_SOCKET_PATH, DEFAULT_TOKEN_URL,
};
pub use error::{TokenError, TransportError};
pub use system_env::SystemEnv;
#[cfg(feature = "transport")]
pub use token::{HttpTokenProvider, parse_token};
