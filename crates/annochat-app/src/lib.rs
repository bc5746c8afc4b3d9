//! Application layer for AnnoChat
//!
//! Pure state machines and generic runtime for the anonymous chat client,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`ChatSession`]: matchmaking, messaging and typing state machine
//! - [`PresenceChannel`]: online-user count feed
//! - [`TokenProvider`]: credential source for chat connections
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod driver;
mod event;
mod input;
mod presence;
mod runtime;
mod session;
mod state;
mod token;
pub mod typing;

pub use action::{PresenceAction, SessionAction};
pub use driver::Driver;
pub use event::{AppEvent, ConnectionId, PresenceEvent, SessionEvent};
pub use input::KeyInput;
pub use presence::PresenceChannel;
pub use runtime::Runtime;
pub use session::{ChatSession, SessionConfig};
pub use state::{
    AppView, Message, PresenceState, Sender, SessionPhase, SessionSnapshot, SessionStatus,
};
pub use token::TokenProvider;
