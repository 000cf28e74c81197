//! Error types for monitor backend operations

use std::fmt;

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while talking to a monitoring backend
#[derive(Debug)]
pub enum BackendError {
    /// Network or backend failure during a status poll. Never fatal: the
    /// owning poller retries on its next interval.
    Fetch(String),

    /// A single user-triggered command (recheck, acknowledge, downtime,
    /// submit) failed. Surfaced once, never retried automatically.
    Action(String),

    /// Failure inside the recheck-all fan-out or barrier management.
    Coordination(String),

    /// Unsupported or unregistered server type, or unusable connection
    /// settings. Fails fast at creation time; the server is not started.
    Configuration(String),
}

impl BackendError {
    /// The bare error text, without the taxonomy prefix. This is what
    /// status displays show; `Display` is for logs.
    pub fn message(&self) -> &str {
        match self {
            BackendError::Fetch(msg)
            | BackendError::Action(msg)
            | BackendError::Coordination(msg)
            | BackendError::Configuration(msg) => msg,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Fetch(msg) => write!(f, "status fetch failed: {}", msg),
            BackendError::Action(msg) => write!(f, "monitor command failed: {}", msg),
            BackendError::Coordination(msg) => write!(f, "recheck coordination failed: {}", msg),
            BackendError::Configuration(msg) => write!(f, "invalid server configuration: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Fetch(err.to_string())
    }
}
