//! MCP client side: one session type over three interchangeable transports.
//!
//! The transport is chosen once, from [`ClientConfig`], when the session is
//! built. Everything after that (connect, discover, invoke, close) is the
//! same regardless of transport.

pub mod config;
pub mod connector;
mod error;
#[cfg(feature = "stdio")]
pub mod local_pipe;
#[cfg(feature = "sse")]
pub mod push_stream;
pub mod session;
#[cfg(feature = "http")]
pub mod streamable;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, ServerCommand};
pub use connector::{ClientService, Connection, Connector, connector_for};
pub use error::SessionError;
pub use session::{
    CloseHandle, RemoteTool, Session, SessionState, discover, invoke, run_scoped, with_session,
};
