//! Session bridge error types.

use thiserror::Error;

use super::session::SessionState;
use crate::core::transport::{TransportKind, UnknownTransport};

/// Errors surfaced by a client [`Session`](super::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown transport selector, transport compiled out, or bad client settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport could not be established (spawn failure, refused connection, ...).
    #[error("Failed to connect over {transport}: {message}")]
    Connect {
        transport: TransportKind,
        message: String,
    },

    /// The initialize exchange failed or timed out.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The operation is not valid in the session's current state.
    #[error("Cannot {operation}: session is {state}")]
    NotReady {
        operation: &'static str,
        state: SessionState,
    },

    /// The connection broke while an operation was in flight.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected a request at the protocol level.
    #[error("Request rejected by server: {0}")]
    Rejected(String),

    /// The server rejected a tool call (unknown tool, invalid arguments).
    #[error("Tool '{tool}' rejected: {message}")]
    ToolRejected { tool: String, message: String },

    /// The tool ran and reported failure, e.g. an upstream HTTP error.
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// The session was closed while the operation was outstanding.
    #[error("Operation cancelled: session closed")]
    Cancelled,
}

impl SessionError {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new connect error.
    pub fn connect(transport: TransportKind, msg: impl ToString) -> Self {
        Self::Connect {
            transport,
            message: msg.to_string(),
        }
    }

    /// Whether the error leaves the session unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Handshake(_) | Self::Transport(_) | Self::Cancelled
        )
    }
}

impl From<UnknownTransport> for SessionError {
    fn from(err: UnknownTransport) -> Self {
        Self::Config(err.to_string())
    }
}
