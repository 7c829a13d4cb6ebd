//! Client connection settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::SessionError;
use crate::core::config::Config;
use crate::core::transport::TransportKind;

/// Default upper bound on connect plus handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the local pipe transport starts the tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServerCommand {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<program> serve --transport stdio [--config <path>]`.
    pub fn serve_stdio(program: impl Into<PathBuf>, config_path: Option<&Path>) -> Self {
        let mut command = Self::new(program, ["serve", "--transport", "stdio"]);
        if let Some(path) = config_path {
            command.args.push("--config".to_string());
            command.args.push(path.display().to_string());
        }
        command
    }
}

/// Everything a [`Session`](super::Session) needs to reach the tool server.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub kind: TransportKind,
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub server_command: ServerCommand,
}

impl ClientConfig {
    /// Settings for `kind` at `host:port`, with the default timeout and the
    /// binary on `PATH` as local pipe server.
    pub fn new(kind: TransportKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            server_command: ServerCommand::serve_stdio(env!("CARGO_PKG_NAME").replace('_', "-"), None),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_server_command(mut self, command: ServerCommand) -> Self {
        self.server_command = command;
        self
    }

    /// Derive client settings from the shared config file.
    ///
    /// The transport selector is parsed here, once; an unknown value fails
    /// before any connection attempt.
    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        let kind: TransportKind = config.server.transport.parse()?;
        let connect_timeout = config
            .client
            .connect_timeout()
            .map_err(|e| SessionError::config(e.to_string()))?;

        let server_command = match &config.client.server_command {
            Some(parts) => {
                let (program, args) = parts
                    .split_first()
                    .ok_or_else(|| SessionError::config("client.server_command must not be empty"))?;
                ServerCommand::new(program, args.iter().cloned())
            }
            None => {
                let exe = std::env::current_exe().map_err(|e| {
                    SessionError::config(format!("cannot locate current executable: {e}"))
                })?;
                ServerCommand::serve_stdio(exe, config.source_path.as_deref())
            }
        };

        Ok(Self {
            kind,
            host: config.server.ip.clone(),
            port: config.server.port,
            connect_timeout,
            server_command,
        })
    }

    /// `http://host:port`, the base of the network transport paths.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_parses_selector_once() {
        let mut config = Config::default();
        config.server.transport = "sse".into();
        config.server.ip = "127.0.0.1".into();
        config.server.port = 9000;

        let client = ClientConfig::from_config(&config).unwrap();
        assert_eq!(client.kind, TransportKind::PushStream);
        assert_eq!(client.base_url(), "http://127.0.0.1:9000");
        assert_eq!(client.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_unknown_selector_fails_before_connecting() {
        let mut config = Config::default();
        config.server.transport = "carrier-pigeon".into();
        let err = ClientConfig::from_config(&config).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_default_server_command_reruns_binary_in_stdio_mode() {
        let mut config = Config::default();
        config.source_path = Some(PathBuf::from("/etc/proxy/config.yaml"));
        let client = ClientConfig::from_config(&config).unwrap();
        assert_eq!(
            client.server_command.args,
            vec!["serve", "--transport", "stdio", "--config", "/etc/proxy/config.yaml"]
        );
    }

    #[test]
    fn test_explicit_server_command() {
        let mut config = Config::default();
        config.client.server_command = Some(vec!["python".into(), "server.py".into()]);
        let client = ClientConfig::from_config(&config).unwrap();
        assert_eq!(client.server_command, ServerCommand::new("python", ["server.py"]));

        config.client.server_command = Some(Vec::new());
        assert!(ClientConfig::from_config(&config).is_err());
    }
}
