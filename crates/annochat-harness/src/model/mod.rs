//! Reference model for model-based testing.
//!
//! [`ModelSession`] is a deliberately naive restatement of how the chat
//! client should look to its user after each [`Operation`]. Property tests
//! feed the same operations to the model and to the real runtime running on
//! the simulation driver, then compare [`ObservableState`].

mod operation;
mod session;

pub use operation::{Operation, SmallText};
pub use session::{ModelMessage, ModelSession, ObservableState};
