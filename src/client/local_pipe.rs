//! Local pipe connector: spawns the tool server and speaks MCP over its
//! stdin/stdout.

use async_trait::async_trait;
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::config::ServerCommand;
use super::connector::{Connection, Connector, handshake};
use super::error::SessionError;
use crate::core::transport::TransportKind;

pub struct LocalPipeConnector {
    command: ServerCommand,
}

impl LocalPipeConnector {
    pub fn new(command: ServerCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &ServerCommand {
        &self.command
    }
}

#[async_trait]
impl Connector for LocalPipeConnector {
    fn kind(&self) -> TransportKind {
        TransportKind::LocalPipe
    }

    fn target(&self) -> String {
        let mut line = self.command.program.display().to_string();
        for arg in &self.command.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    #[instrument(skip(self), fields(command = %self.target()))]
    async fn connect(&self) -> Result<Connection, SessionError> {
        let mut command = Command::new(&self.command.program);
        command.args(&self.command.args).kill_on_drop(true);

        let transport = TokioChildProcess::new(command)
            .map_err(|e| SessionError::connect(self.kind(), format!("spawn {}: {e}", self.target())))?;
        debug!("Server process spawned");

        let service = handshake(self.kind(), transport).await?;
        Ok(Connection::new(service))
    }
}
