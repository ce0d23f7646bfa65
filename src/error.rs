//! Error taxonomy shared by the session binding, the dispatcher and the scheduler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any I/O happened.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Operation timed out after {0} ms")]
    TimedOut(u64),

    #[error("Session is not connected")]
    NotConnected,

    #[error("Failed to load settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Operator input errors, reported without a failure exit code.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
