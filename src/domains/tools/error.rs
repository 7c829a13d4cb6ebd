//! Tool-specific error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while building, registering or invoking tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A tool descriptor is malformed or cannot be satisfied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool with the same name is already registered.
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// No tool with the requested name is registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The call arguments do not satisfy the tool's parameter list.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The outbound HTTP call failed.
    #[error("Upstream call for tool '{tool}' failed: {source}")]
    Upstream {
        tool: String,
        #[source]
        source: UpstreamError,
    },
}

impl ToolError {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Wrap an upstream failure with the name of the tool that caused it.
    pub fn upstream(tool: impl Into<String>, source: UpstreamError) -> Self {
        Self::Upstream {
            tool: tool.into(),
            source,
        }
    }
}

/// Failures of the outbound HTTP call made by a compiled adapter.
///
/// None of these are retried.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The endpoint answered with a status code >= 400.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within the tool's timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection could not be established (refused, DNS, TLS handshake).
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport or body-read failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The composed request URL is not valid.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl UpstreamError {
    /// Classify a reqwest failure.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(error_chain(&err))
        } else {
            Self::Request(error_chain(&err))
        }
    }

    /// HTTP status code, when the upstream produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Render an error with its sources, e.g. "error sending request: connection refused".
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}
