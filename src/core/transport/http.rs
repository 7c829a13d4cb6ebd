//! Streamable HTTP transport implementation.
//!
//! Serves the MCP streamable HTTP protocol at `/mcp` through rmcp's
//! `StreamableHttpService`, with one `McpServer` clone per session.

use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common;
use super::{MCP_PATH, NetworkConfig, TransportError, TransportResult};
use crate::core::McpServer;

/// Streamable HTTP transport handler.
pub struct HttpTransport {
    config: NetworkConfig,
    ct: CancellationToken,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ct: CancellationToken::new(),
        }
    }

    /// Stop serving when `ct` is cancelled.
    pub fn with_cancellation(mut self, ct: CancellationToken) -> Self {
        self.ct = ct;
        self
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Build the axum router without binding a socket.
    pub fn router(&self, server: McpServer) -> Router {
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );
        let app = Router::new().nest_service(MCP_PATH, service);
        common::finish_router(app, self.config.enable_cors)
    }

    /// Bind `host:port` and run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let listener = common::bind(&self.config).await?;
        self.serve(listener, server).await
    }

    /// Run the HTTP transport on an already bound listener.
    pub async fn serve(self, listener: TcpListener, server: McpServer) -> TransportResult<()> {
        let app = self.router(server);
        let addr = listener.local_addr().map_err(TransportError::Io)?;
        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (MCP streamable HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → MCP:      POST/GET/DELETE {MCP_PATH}");

        let ct = self.ct.clone();
        common::serve(listener, app, async move { ct.cancelled_owned().await }).await
    }
}
