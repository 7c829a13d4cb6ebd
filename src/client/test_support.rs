//! In-process connectors for session tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::DuplexStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::connector::{Connection, Connector, handshake};
use super::error::SessionError;
use crate::core::McpServer;
use crate::core::config::Config;
use crate::core::transport::TransportKind;
use crate::domains::tools::{HttpMethod, ToolDescriptor, ToolRegistry};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Server with two tools backed by the HTTP service at `base`.
pub(crate) fn upstream_server(base: &str) -> McpServer {
    let registry = ToolRegistry::from_descriptors([
        ToolDescriptor::new("get_item", "Fetch one item", format!("{base}/items/{{id}}"))
            .with_path_param("id", "integer"),
        ToolDescriptor::new("create_item", "Create an item", format!("{base}/items"))
            .with_method(HttpMethod::Post)
            .with_body_param("name", "string")
            .with_body_param("price", "number"),
    ])
    .unwrap();
    McpServer::from_registry(Config::default(), registry)
}

/// Runs a fresh server service per connection over an in-memory pipe.
#[derive(Clone)]
pub(crate) struct InProcessConnector {
    server: McpServer,
    server_ct: CancellationToken,
    pub(crate) finished_servers: Arc<AtomicUsize>,
}

impl InProcessConnector {
    pub(crate) fn new(server: McpServer) -> Self {
        Self {
            server,
            server_ct: CancellationToken::new(),
            finished_servers: Arc::default(),
        }
    }

    /// Stop every server service started by this connector.
    pub(crate) fn shutdown_server(&self) {
        self.server_ct.cancel();
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    fn kind(&self) -> TransportKind {
        TransportKind::LocalPipe
    }

    fn target(&self) -> String {
        "in-process".to_string()
    }

    async fn connect(&self) -> Result<Connection, SessionError> {
        use rmcp::ServiceExt;

        let (client_io, server_io) = tokio::io::duplex(PIPE_CAPACITY);
        let server = self.server.clone();
        let ct = self.server_ct.child_token();
        let finished = self.finished_servers.clone();
        tokio::spawn(async move {
            match server.serve_with_ct(server_io, ct).await {
                Ok(running) => {
                    let _ = running.waiting().await;
                }
                Err(e) => warn!("In-process server failed to initialize: {}", e),
            }
            finished.fetch_add(1, Ordering::SeqCst);
        });

        Ok(Connection::new(handshake(self.kind(), client_io).await?))
    }
}

/// Always fails the handshake.
pub(crate) struct FailingConnector;

#[async_trait]
impl Connector for FailingConnector {
    fn kind(&self) -> TransportKind {
        TransportKind::LocalPipe
    }

    fn target(&self) -> String {
        "failing".to_string()
    }

    async fn connect(&self) -> Result<Connection, SessionError> {
        Err(SessionError::Handshake(
            "server rejected initialize".to_string(),
        ))
    }
}

/// A peer that accepts the connection but never answers.
#[derive(Default)]
pub(crate) struct SilentConnector {
    held: Mutex<Vec<DuplexStream>>,
}

#[async_trait]
impl Connector for SilentConnector {
    fn kind(&self) -> TransportKind {
        TransportKind::LocalPipe
    }

    fn target(&self) -> String {
        "silent".to_string()
    }

    async fn connect(&self) -> Result<Connection, SessionError> {
        let (client_io, server_io) = tokio::io::duplex(PIPE_CAPACITY);
        if let Ok(mut held) = self.held.lock() {
            held.push(server_io);
        }
        Ok(Connection::new(handshake(self.kind(), client_io).await?))
    }
}
