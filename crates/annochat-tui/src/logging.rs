//! File logging.

use std::{fs::OpenOptions, io, path::Path, sync::Mutex};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log file could not be opened.
    #[error("cannot open log file: {0}")]
    Io(#[from] io::Error),

    /// Filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    Init(String),
}

/// Send logs to `path`, appending.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init(path: &Path, level: &str) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::Filter(e.to_string()))?,
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
