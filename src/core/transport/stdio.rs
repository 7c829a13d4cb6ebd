//! STDIO transport implementation.
//!
//! The local pipe transport: the server talks JSON-RPC over its own
//! stdin/stdout, so every log line must go to stderr.

use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Run the STDIO transport until the peer closes stdin or `ct` fires.
    pub async fn run(server: McpServer, ct: CancellationToken) -> TransportResult<()> {
        info!(tools = server.registry().len(), "Ready - communicating via stdin/stdout");

        let service = server
            .serve_with_ct(rmcp::transport::stdio(), ct)
            .await
            .map_err(TransportError::session_start)?;

        let reason = service
            .waiting()
            .await
            .map_err(TransportError::stopped)?;

        info!(?reason, "STDIO transport finished");
        Ok(())
    }
}
