//! Error types for the shellpilot runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Remote error status for an absent element, swallowed by poll-waits.
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// Remote error status for an async script that did not signal completion.
pub const SCRIPT_TIMEOUT: &str = "script timeout";

/// Errors that can occur anywhere in the shellpilot stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to reach the remote shell or complete the hello handshake.
    #[error("Failed to connect to remote shell: {0}")]
    ConnectionFailed(String),

    /// Transport-level error (socket communication).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Protocol-level error (malformed or unexpected messages).
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Session lifecycle misuse (command outside an active session).
    #[error("Session error: {0}")]
    Session(String),

    /// Remote script error with full payload.
    #[error("{error}: {message}")]
    Remote {
        /// Error status reported by the server (e.g. "no such element")
        error: String,
        /// Human-readable error message
        message: String,
        /// Remote stack trace (if available)
        stacktrace: Option<String>,
    },

    /// Async script did not signal completion in time.
    #[error("Script timeout: {0}")]
    ScriptTimeout(String),

    /// A poll-wait condition did not become true in time.
    #[error("Timeout after {ms}ms waiting for: {condition}")]
    WaitTimeout { condition: String, ms: u64 },

    /// App launch returned no frame.
    #[error("Failed to launch app: {app}")]
    Launch { app: String },

    /// A setting or preference write was rejected by the remote.
    #[error("Unable to update '{name}' to '{value}'")]
    Update { name: String, value: String },

    /// A remote operation reported failure (falsy result).
    #[error("Remote operation failed: {operation}")]
    OperationFailed { operation: String },

    /// Invalid argument provided to method.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel closed unexpectedly.
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

impl Error {
    /// Returns the error status if this is a Remote error.
    pub fn error_status(&self) -> Option<&str> {
        match self {
            Error::Remote { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the stack trace if this is a Remote error with a stack.
    pub fn stack_trace(&self) -> Option<&str> {
        match self {
            Error::Remote { stacktrace, .. } => stacktrace.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this is a timeout error of any kind.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::ScriptTimeout(_) | Error::WaitTimeout { .. } => true,
            Error::Remote { error, .. } => error == SCRIPT_TIMEOUT || error == "timeout",
            _ => false,
        }
    }

    /// Returns true if the remote reported that a queried element is absent.
    ///
    /// This is the only condition poll-waits swallow and retry.
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, Error::Remote { error, .. } if error == NO_SUCH_ELEMENT)
    }
}
