//! HTTP Tool Proxy
//!
//! Exposes HTTP endpoints, described declaratively in a YAML file, as tools of
//! a Model Context Protocol (MCP) server, and provides a client that reaches
//! that server over any of three transports.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the MCP server handler and the
//!   server-side transports (stdio, SSE, streamable HTTP)
//! - **domains**: business logic by bounded context
//!   - **tools**: descriptors, the adapter builder, the registry and the
//!     outbound HTTP executor
//! - **client**: the transport-agnostic session used to discover and invoke
//!   tools
//!
//! # Example
//!
//! ```rust,no_run
//! use http_tool_proxy::client::{self, ClientConfig};
//! use http_tool_proxy::core::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let tools = client::discover(&ClientConfig::from_config(&config)?).await?;
//!     for tool in tools {
//!         println!("{}: {}", tool.name, tool.description);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod core;
pub mod domains;

pub use client::{Session, SessionError};
pub use core::{Config, Error, McpServer, Result};
