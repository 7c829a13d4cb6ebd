//! Error types and handling for the HTTP tool proxy.
//!
//! Each subsystem has its own error enum (`ToolError`, `TransportError`,
//! `SessionError`); this module aggregates them into one crate-level type
//! used at the seams between subsystems.

use thiserror::Error;

use super::transport::{TransportError, UnknownTransport};
use crate::client::SessionError;
use crate::domains::tools::ToolError;

/// A specialized Result type for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the HTTP tool proxy.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Error originating from the client session bridge.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Error originating from a server transport.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from file operations or network communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file syntax or shape errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal errors that should not occur under normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error stems from configuration rather than runtime failure.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Yaml(_)
                | Self::Tool(ToolError::Config(_) | ToolError::DuplicateTool(_))
                | Self::Session(SessionError::Config(_))
        )
    }
}

impl From<UnknownTransport> for Error {
    fn from(err: UnknownTransport) -> Self {
        Self::Config(err.to_string())
    }
}
