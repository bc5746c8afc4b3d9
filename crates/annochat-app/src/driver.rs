//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{fmt::Debug, future::Future, ops::Sub, time::Duration};

use annochat_proto::ClientEvent;

use crate::{AppEvent, AppView, ConnectionId};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal client and in simulation.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, tokio-tungstenite for sockets
/// - **Simulation**: scripted events on a virtual clock
///
/// # Connection tagging
///
/// Chat events must be tagged with the [`ConnectionId`] passed to
/// [`open_chat`](Driver::open_chat). After [`close_chat`](Driver::close_chat)
/// the driver must not produce further events for that id.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration>;

    /// Wait for the next event.
    ///
    /// Must return no later than `deadline` when one is given (with
    /// [`AppEvent::Tick`] if nothing else happened). Returns `None` if no
    /// event is ready.
    fn poll_event(
        &mut self,
        deadline: Option<Self::Instant>,
    ) -> impl Future<Output = Result<Option<AppEvent<Self::Instant>>, Self::Error>> + Send;

    /// Start opening a chat socket with `token` as credential.
    ///
    /// Connection failures are reported as
    /// [`SessionEvent::TransportClosed`](crate::SessionEvent::TransportClosed),
    /// not as errors.
    fn open_chat(&mut self, conn: ConnectionId, token: String) -> Result<(), Self::Error>;

    /// Emit an event on the chat socket. Dropped if `conn` is not open.
    fn emit_chat(&mut self, conn: ConnectionId, event: ClientEvent) -> Result<(), Self::Error>;

    /// Detach listeners and close the chat socket. Idempotent.
    fn close_chat(&mut self, conn: ConnectionId);

    /// Start opening the presence socket.
    fn open_presence(&mut self) -> Result<(), Self::Error>;

    /// Close the presence socket. Idempotent.
    fn close_presence(&mut self);

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, view: &AppView) -> Result<(), Self::Error>;

    /// Stop and clean up resources.
    fn stop(&mut self);
}
