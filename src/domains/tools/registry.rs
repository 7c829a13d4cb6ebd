//! Tool Registry - holds every compiled adapter and dispatches calls by name.
//!
//! The registry is built once at startup from the `tools:` section of the
//! config file and is read-only afterwards, so it can be shared behind an
//! `Arc` by every transport session.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use tracing::{info, warn};

use super::adapter::{AdapterBuilder, CompiledAdapter};
use super::descriptor::ToolDescriptor;
use super::error::ToolError;
use super::executor::HttpExecutor;

/// Discovery entry for one registered tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub input_schema: Arc<JsonObject>,
}

/// Name-keyed collection of compiled adapters, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<CompiledAdapter>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register every descriptor. All adapters share one HTTP client.
    ///
    /// Fails on the first descriptor that does not compile or whose name is
    /// already taken.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, ToolError>
    where
        I: IntoIterator<Item = ToolDescriptor>,
    {
        let builder = AdapterBuilder::with_executor(HttpExecutor::new());
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(builder.build(descriptor)?)?;
        }
        info!(tools = registry.len(), "Tool registry ready");
        Ok(registry)
    }

    /// Add a compiled adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already registered.
    pub fn register(&mut self, adapter: CompiledAdapter) -> Result<(), ToolError> {
        if self.index.contains_key(adapter.name()) {
            return Err(ToolError::DuplicateTool(adapter.name().to_string()));
        }
        self.index.insert(adapter.name().to_string(), self.tools.len());
        self.tools.push(adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CompiledAdapter> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledAdapter> {
        self.tools.iter()
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(CompiledAdapter::name).collect()
    }

    /// Discovery listing, in registration order.
    pub fn list(&self) -> Vec<ToolListing> {
        self.tools
            .iter()
            .map(|t| ToolListing {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema().clone(),
            })
            .collect()
    }

    /// Get all tools as MCP `Tool` models.
    pub fn get_all_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(CompiledAdapter::to_tool).collect()
    }

    /// Invoke a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for an unregistered name, otherwise
    /// whatever the adapter's invocation returns.
    pub async fn invoke(&self, name: &str, args: &JsonObject) -> Result<String, ToolError> {
        let Some(adapter) = self.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(ToolError::UnknownTool(name.to_string()));
        };
        adapter.invoke(args).await
    }
}
