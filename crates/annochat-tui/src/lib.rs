//! Terminal UI for AnnoChat
//!
//! A thin shell over [`annochat_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`annochat_app::Runtime`].
//!
//! This crate only handles the terminal, the command line and log output.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod logging;
pub mod terminal;
pub mod ui;

pub use annochat_app::{AppEvent, AppView, Driver, KeyInput, Runtime};
pub use cli::Args;
pub use logging::LoggingError;
pub use terminal::{TerminalDriver, TerminalError};
