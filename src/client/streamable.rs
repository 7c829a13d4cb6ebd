//! Streamable request connector: MCP streamable HTTP at `http://ip:port/mcp`.

use async_trait::async_trait;
use rmcp::transport::StreamableHttpClientTransport;
use tracing::instrument;

use super::connector::{Connection, Connector, handshake};
use super::error::SessionError;
use crate::core::transport::{MCP_PATH, TransportKind};

pub struct StreamableRequestConnector {
    url: String,
}

impl StreamableRequestConnector {
    /// Connector for the server at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Self {
        Self {
            url: format!("{}{MCP_PATH}", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Connector for StreamableRequestConnector {
    fn kind(&self) -> TransportKind {
        TransportKind::StreamableRequest
    }

    fn target(&self) -> String {
        self.url.clone()
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> Result<Connection, SessionError> {
        let transport = StreamableHttpClientTransport::from_uri(self.url.clone());
        let service = handshake(self.kind(), transport).await?;
        Ok(Connection::new(service))
    }
}
