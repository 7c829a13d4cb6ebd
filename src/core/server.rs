//! MCP Server implementation.
//!
//! `McpServer` is the rmcp `ServerHandler` shared by every transport. It owns
//! nothing but the read-only tool registry and the `ToolRouter` built from it,
//! so cloning it per transport session is cheap.
//!
//! The ToolRouter is built dynamically in `domains/tools/router.rs` from the
//! `tools:` list of the config file.

use rmcp::handler::server::tool::{ToolCallContext, ToolRouter};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, model::*};
use std::sync::Arc;
use tracing::info;

use super::config::Config;
use super::error::Result as CrateResult;
use crate::domains::tools::{ToolRegistry, build_tool_router};

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Compiled adapters, populated once before any transport starts.
    registry: Arc<ToolRegistry>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a server from a loaded configuration.
    ///
    /// Every descriptor is compiled and registered here, so a malformed tool
    /// or a duplicate name fails before any transport accepts connections.
    pub fn new(config: Config) -> CrateResult<Self> {
        let registry = ToolRegistry::from_descriptors(config.tools.iter().cloned())?;
        Ok(Self::from_registry(config, registry))
    }

    /// Create a server around an already populated registry.
    pub fn from_registry(config: Config, registry: ToolRegistry) -> Self {
        let registry = Arc::new(registry);
        info!(
            name = %config.server.name,
            tools = registry.len(),
            "MCP server initialized"
        );

        Self {
            tool_router: build_tool_router::<Self>(registry.clone()),
            config: Arc::new(config),
            registry,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}

/// Calls go through the `ToolRouter`; listings come from the registry so
/// clients see tools in config order.
impl ServerHandler for McpServer {
    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tcc = ToolCallContext::new(self, request, context);
        self.tool_router.call(tcc).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.registry.get_all_tools()))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tool_router.get(name).cloned()
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "{} exposes {} HTTP endpoint(s) as tools. Every tool parameter is required; \
                 results are the raw response bodies of the underlying HTTP calls.",
                self.name(),
                self.registry.len()
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name().to_string(),
                version: self.version().to_string(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolDescriptor;

    fn config_with_tools(tools: Vec<ToolDescriptor>) -> Config {
        Config {
            tools,
            ..Config::default()
        }
    }

    #[test]
    fn test_server_builds_router_from_config() {
        let config = config_with_tools(vec![
            ToolDescriptor::new("get_item", "Fetch one item", "https://api.example.com/items/{id}")
                .with_path_param("id", "int"),
        ]);
        let server = McpServer::new(config).unwrap();
        assert_eq!(server.registry().len(), 1);
        assert_eq!(server.tool_router.list_all().len(), 1);
        assert_eq!(server.name(), "HTTP Tool Proxy");
    }

    #[test]
    fn test_invalid_tool_fails_startup() {
        let config = config_with_tools(vec![ToolDescriptor::new(
            "ping",
            "No params",
            "https://api.example.com/ping",
        )]);
        let err = McpServer::new(config).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_only_tools_capability_is_advertised() {
        let server = McpServer::new(Config::default()).unwrap();
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_none());
        assert!(info.capabilities.prompts.is_none());
        assert_eq!(info.server_info.name, "HTTP Tool Proxy");
    }
}
