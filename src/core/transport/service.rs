//! Transport service - starts the MCP server on the configured transport.

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{TransportConfig, TransportResult};
use crate::core::McpServer;

#[cfg(feature = "stdio")]
use super::stdio::StdioTransport;

#[cfg(feature = "sse")]
use super::sse::SseTransport;

#[cfg(feature = "http")]
use super::http::HttpTransport;

/// Transport service - manages the transport layer for the MCP server.
pub struct TransportService {
    config: TransportConfig,
    ct: CancellationToken,
}

impl TransportService {
    /// Create a new transport service with the given configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            ct: CancellationToken::new(),
        }
    }

    /// Shut the transport down when `ct` is cancelled.
    pub fn with_cancellation(mut self, ct: CancellationToken) -> Self {
        self.ct = ct;
        self
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Start the transport with the given MCP server.
    ///
    /// This method blocks until the transport is shut down.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        info!("Starting transport: {}", self.config.description());

        match self.config {
            #[cfg(feature = "stdio")]
            TransportConfig::Stdio => StdioTransport::run(server, self.ct).await,
            #[cfg(feature = "sse")]
            TransportConfig::Sse(cfg) => {
                SseTransport::new(cfg)
                    .with_cancellation(self.ct)
                    .run(server)
                    .await
            }
            #[cfg(feature = "http")]
            TransportConfig::Http(cfg) => {
                HttpTransport::new(cfg)
                    .with_cancellation(self.ct)
                    .run(server)
                    .await
            }
        }
    }
}
