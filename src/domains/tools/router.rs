//! Tool Router - builds the rmcp ToolRouter from the registry.
//!
//! Each registered adapter becomes one dynamic route. Upstream failures are
//! reported as tool results with `is_error` set; bad arguments and unknown
//! names are reported as protocol errors.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, ToolRouter},
    model::{CallToolResult, Content, Tool},
};

use super::error::ToolError;
use super::registry::ToolRegistry;

/// Build the tool router with one route per registered tool.
pub fn build_tool_router<S>(registry: Arc<ToolRegistry>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    let mut router = ToolRouter::new();
    for adapter in registry.iter() {
        router = router.with_route(create_route(registry.clone(), adapter.to_tool()));
    }
    router
}

fn create_route<S>(registry: Arc<ToolRegistry>, tool: Tool) -> ToolRoute<S>
where
    S: Send + Sync + 'static,
{
    let name = tool.name.to_string();

    ToolRoute::new_dyn(tool, move |ctx: ToolCallContext<'_, S>| {
        let args = ctx.arguments.clone().unwrap_or_default();
        let registry = registry.clone();
        let name = name.clone();
        async move { call_result(registry.invoke(&name, &args).await) }.boxed()
    })
}

/// Map an invocation outcome onto the MCP result model.
pub(crate) fn call_result(outcome: Result<String, ToolError>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(err @ ToolError::Upstream { .. }) => {
            Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
        }
        Err(err @ (ToolError::InvalidArguments { .. } | ToolError::UnknownTool(_))) => {
            Err(McpError::invalid_params(err.to_string(), None))
        }
        Err(err) => Err(McpError::internal_error(err.to_string(), None)),
    }
}
