//! Configuration management for the HTTP tool proxy.
//!
//! The whole process (server and client side) is driven by one YAML file:
//! the `tools:` list consumed by the adapter builder, a `server:` section
//! selecting the transport and its bind address, and optional `logging:` and
//! `client:` sections. Command-line flags and `MCP_*` environment variables
//! are folded in afterwards through [`Overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::error::{Error, Result};
use crate::domains::tools::ToolDescriptor;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP endpoints exposed as tools.
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,

    /// Transport selection and server identity.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Settings used by the session bridge.
    #[serde(default)]
    pub client: ClientSettings,

    /// File this config was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// The `server:` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// Transport selector as written in the file (`stdio`, `sse` or `http`).
    /// Parsed into a `TransportKind` when a server or session is constructed.
    pub transport: String,

    /// Host address to bind to (server) or connect to (client).
    pub ip: String,

    /// Port number for the network transports.
    pub port: u16,

    /// Enable permissive CORS on the network transports.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "HTTP Tool Proxy".to_string(),
            transport: "stdio".to_string(),
            ip: "localhost".to_string(),
            port: 8080,
            cors: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// The `client:` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Upper bound, in seconds, on connect plus initialize handshake.
    pub connect_timeout: f64,

    /// Command used by the local pipe transport to start the tool server,
    /// program first. Defaults to re-running this executable in stdio mode.
    pub server_command: Option<Vec<String>>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: 30.0,
            server_command: None,
        }
    }
}

impl ClientSettings {
    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Result<Duration> {
        if !self.connect_timeout.is_finite() || self.connect_timeout <= 0.0 {
            return Err(Error::config(format!(
                "client.connect_timeout must be a positive number of seconds, got {}",
                self.connect_timeout
            )));
        }
        Duration::try_from_secs_f64(self.connect_timeout).map_err(|e| {
            Error::config(format!(
                "client.connect_timeout of {} seconds is out of range: {e}",
                self.connect_timeout
            ))
        })
    }
}

/// Values from the command line or environment that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Config {
    /// Create a new configuration with default values and no tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, or
    /// [`Error::Yaml`] if it is not a valid config document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {e}", path.display()))
        })?;

        let mut config = Self::from_yaml_str(&text)?;
        config.source_path = Some(path.to_path_buf());
        debug!(path = %path.display(), tools = config.tools.len(), "Config file parsed");
        Ok(config)
    }

    /// Parse a YAML config document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply command-line or environment overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(transport) = overrides.transport {
            debug!(%transport, "Transport overridden");
            self.server.transport = transport;
        }
        if let Some(host) = overrides.host {
            self.server.ip = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }
}
