//! Transport layer for the MCP server.
//!
//! This module provides the server side of the three transports:
//! - **STDIO**: standard input/output (local pipe) - feature: `stdio`
//! - **SSE**: server-push event stream plus a POST path - feature: `sse`
//! - **HTTP**: MCP streamable HTTP - feature: `http`
//!
//! Each transport handles the connection lifecycle and delegates
//! message processing to the `McpServer` handler.

mod config;
mod error;
mod service;

#[cfg(any(feature = "sse", feature = "http"))]
mod common;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "sse")]
pub mod sse;

#[cfg(feature = "stdio")]
pub mod stdio;

#[cfg(not(any(feature = "stdio", feature = "sse", feature = "http")))]
compile_error!("At least one transport feature must be enabled: stdio, sse, or http");

pub use config::{
    MCP_PATH, MESSAGES_PATH, NetworkConfig, SSE_PATH, TransportConfig, TransportKind,
    UnknownTransport,
};
pub use error::{TransportError, TransportResult};
pub use service::TransportService;
