//! Tools domain module.
//!
//! Every tool served by this crate is an HTTP endpoint described in the config
//! file. Descriptors are compiled into adapters, collected in a registry and
//! exposed to MCP clients through a dynamically built `ToolRouter`.
//!
//! ## Architecture
//!
//! - `descriptor.rs` - Config-file form of a tool (`ToolDescriptor`)
//! - `adapter.rs` - Validation, input schema and argument routing (`CompiledAdapter`)
//! - `executor.rs` - The outbound HTTP call
//! - `registry.rs` - Name-keyed collection of adapters and call dispatch
//! - `router.rs` - rmcp `ToolRouter` built from the registry
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a Tool
//!
//! Add an entry to the `tools:` list of the config file. No code changes needed.

pub mod adapter;
pub mod descriptor;
mod error;
pub mod executor;
mod registry;
pub mod router;

pub use adapter::{AdapterBuilder, CompiledAdapter, ParamLocation, ParamSpec};
pub use descriptor::{HttpMethod, ParamMap, ParamType, ToolDescriptor};
pub use error::{ToolError, UpstreamError};
pub use executor::{HttpExecutor, RequestPlan};
pub use registry::{ToolListing, ToolRegistry};
pub use router::build_tool_router;
