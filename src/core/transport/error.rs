//! Server transport errors.

use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

/// Failures while bringing up or running a server transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Unknown selector, or a transport whose feature is compiled out.
    #[error("Transport configuration error: {0}")]
    Config(String),

    #[error("Cannot listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// A client connected but the MCP initialize exchange failed.
    #[error("MCP session failed to start: {0}")]
    SessionStart(String),

    /// The MCP service or the HTTP server stopped abnormally.
    #[error("Transport stopped: {0}")]
    Stopped(String),
}

impl TransportError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    pub fn session_start(err: impl ToString) -> Self {
        Self::SessionStart(err.to_string())
    }

    pub fn stopped(err: impl ToString) -> Self {
        Self::Stopped(err.to_string())
    }
}
