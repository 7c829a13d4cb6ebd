//! Transport configuration types.
//!
//! [`TransportKind`] is the parsed form of the `server.transport` selector and
//! is shared by the server side (which transport to listen on) and the client
//! side (which connector to build). [`TransportConfig`] is the server-side
//! runtime configuration derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::TransportError;
use crate::core::config::ServerConfig;

/// Path of the server-push event stream.
pub const SSE_PATH: &str = "/sse";

/// Path the push-stream client posts its messages to.
pub const MESSAGES_PATH: &str = "/messages/";

/// Path of the streamable request endpoint.
pub const MCP_PATH: &str = "/mcp";

/// The three interchangeable transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransportKind {
    /// Server over the standard streams of a co-located process.
    LocalPipe,
    /// One-way event stream plus a companion POST path.
    PushStream,
    /// Bidirectional request/response channel on one path.
    StreamableRequest,
}

/// A transport selector that names none of the known transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transport '{0}' (expected stdio, sse or http)")]
pub struct UnknownTransport(pub String);

impl TransportKind {
    pub const ALL: [TransportKind; 3] = [Self::LocalPipe, Self::PushStream, Self::StreamableRequest];

    /// Selector value as written in the config file.
    pub fn selector(self) -> &'static str {
        match self {
            Self::LocalPipe => "stdio",
            Self::PushStream => "sse",
            Self::StreamableRequest => "http",
        }
    }

    /// Cargo feature that compiles this transport in.
    pub fn feature(self) -> &'static str {
        self.selector()
    }

    /// Whether this transport was compiled in.
    pub fn is_available(self) -> bool {
        match self {
            Self::LocalPipe => cfg!(feature = "stdio"),
            Self::PushStream => cfg!(feature = "sse"),
            Self::StreamableRequest => cfg!(feature = "http"),
        }
    }

    /// Whether this transport listens on (or connects to) `ip:port`.
    pub fn is_network(self) -> bool {
        !matches!(self, Self::LocalPipe)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" | "local-pipe" => Ok(Self::LocalPipe),
            "sse" | "server-push-stream" => Ok(Self::PushStream),
            "http" | "streamable-http" | "streamable-request" => Ok(Self::StreamableRequest),
            _ => Err(UnknownTransport(s.to_string())),
        }
    }
}

impl TryFrom<String> for TransportKind {
    type Error = UnknownTransport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransportKind> for String {
    fn from(kind: TransportKind) -> Self {
        kind.selector().to_string()
    }
}

/// Bind settings shared by the network transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Host address to bind to.
    pub host: String,

    /// Port number to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Enable CORS for browser clients.
    pub enable_cors: bool,
}

impl NetworkConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            enable_cors: true,
        }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Server transport configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Standard input/output transport.
    #[cfg(feature = "stdio")]
    Stdio,

    /// Legacy SSE transport (`GET /sse` + `POST /messages/`).
    #[cfg(feature = "sse")]
    Sse(NetworkConfig),

    /// Streamable HTTP transport at `/mcp`.
    #[cfg(feature = "http")]
    Http(NetworkConfig),
}

impl TransportConfig {
    /// Resolve the `server:` section into a runnable transport configuration.
    ///
    /// # Errors
    ///
    /// Fails when the selector is unknown or names a transport whose Cargo
    /// feature is disabled.
    pub fn from_server_config(server: &ServerConfig) -> Result<Self, TransportError> {
        let kind: TransportKind = server
            .transport
            .parse()
            .map_err(|e: UnknownTransport| TransportError::config(e.to_string()))?;

        #[allow(unused_variables)]
        let network = NetworkConfig {
            host: server.ip.clone(),
            port: server.port,
            enable_cors: server.cors,
        };

        match kind {
            #[cfg(feature = "stdio")]
            TransportKind::LocalPipe => Ok(Self::Stdio),
            #[cfg(feature = "sse")]
            TransportKind::PushStream => Ok(Self::Sse(network)),
            #[cfg(feature = "http")]
            TransportKind::StreamableRequest => Ok(Self::Http(network)),
            #[allow(unreachable_patterns)]
            other => Err(TransportError::config(format!(
                "transport '{other}' is not compiled in (enable the '{}' feature)",
                other.feature()
            ))),
        }
    }

    /// Create a STDIO transport config.
    #[cfg(feature = "stdio")]
    pub fn stdio() -> Self {
        Self::Stdio
    }

    /// Create an SSE transport config.
    #[cfg(feature = "sse")]
    pub fn sse(host: impl Into<String>, port: u16) -> Self {
        Self::Sse(NetworkConfig::new(host, port))
    }

    /// Create a streamable HTTP transport config.
    #[cfg(feature = "http")]
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self::Http(NetworkConfig::new(host, port))
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => TransportKind::LocalPipe,
            #[cfg(feature = "sse")]
            Self::Sse(_) => TransportKind::PushStream,
            #[cfg(feature = "http")]
            Self::Http(_) => TransportKind::StreamableRequest,
        }
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (local pipe)".to_string(),
            #[cfg(feature = "sse")]
            Self::Sse(cfg) => format!("SSE on {} ({SSE_PATH} + {MESSAGES_PATH})", cfg.address()),
            #[cfg(feature = "http")]
            Self::Http(cfg) => format!("Streamable HTTP on {}{MCP_PATH}", cfg.address()),
        }
    }

    /// Check if this transport is the STDIO mode.
    pub fn is_stdio(&self) -> bool {
        self.kind() == TransportKind::LocalPipe
    }
}
