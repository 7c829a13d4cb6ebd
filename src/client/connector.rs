//! Transport connectors.
//!
//! A [`Connector`] knows how to open one kind of transport and run the MCP
//! initialize exchange over it. The concrete connector is picked once, by
//! [`connector_for`], when a session is constructed.

use async_trait::async_trait;
use rmcp::model::{ClientInfo, Implementation};
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceExt};
use rmcp::transport::IntoTransport;
use tokio::task::JoinHandle;
use tracing::debug;

use super::config::ClientConfig;
use super::error::SessionError;
use crate::core::transport::TransportKind;

pub type DynClientService = Box<dyn DynService<RoleClient>>;

/// A running, initialized rmcp client.
pub type ClientService = RunningService<RoleClient, DynClientService>;

/// One open transport connection plus the helper tasks that feed it.
pub struct Connection {
    service: ClientService,
    tasks: BackgroundTasks,
}

impl Connection {
    pub fn new(service: ClientService) -> Self {
        Self {
            service,
            tasks: BackgroundTasks::default(),
        }
    }

    pub(crate) fn with_tasks(service: ClientService, tasks: BackgroundTasks) -> Self {
        Self { service, tasks }
    }

    pub fn service(&self) -> &ClientService {
        &self.service
    }

    /// Cancel the rmcp service (closing the transport and reaping any child
    /// process), then stop the helper tasks.
    pub async fn close(self) -> Result<(), SessionError> {
        let Self { service, tasks } = self;
        let outcome = service.cancel().await;
        drop(tasks);
        match outcome {
            Ok(reason) => {
                debug!(?reason, "Connection closed");
                Ok(())
            }
            Err(e) => Err(SessionError::Transport(format!("failed to stop client service: {e}"))),
        }
    }
}

/// Helper tasks owned by a connection; aborted when dropped.
#[derive(Default)]
pub(crate) struct BackgroundTasks(Vec<JoinHandle<()>>);

impl BackgroundTasks {
    pub(crate) fn push(&mut self, handle: JoinHandle<()>) {
        self.0.push(handle);
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Opens one kind of transport to the tool server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Which transport this connector speaks.
    fn kind(&self) -> TransportKind;

    /// Human-readable target (command line or URL), for logs.
    fn target(&self) -> String;

    /// Open the transport and complete the initialize handshake.
    async fn connect(&self) -> Result<Connection, SessionError>;
}

/// Pick the connector for the configured transport.
pub fn connector_for(config: &ClientConfig) -> Result<Box<dyn Connector>, SessionError> {
    match config.kind {
        #[cfg(feature = "stdio")]
        TransportKind::LocalPipe => Ok(Box::new(super::local_pipe::LocalPipeConnector::new(
            config.server_command.clone(),
        ))),
        #[cfg(feature = "sse")]
        TransportKind::PushStream => Ok(Box::new(super::push_stream::PushStreamConnector::new(
            &config.base_url(),
        )?)),
        #[cfg(feature = "http")]
        TransportKind::StreamableRequest => Ok(Box::new(
            super::streamable::StreamableRequestConnector::new(&config.base_url()),
        )),
        #[allow(unreachable_patterns)]
        other => Err(SessionError::config(format!(
            "transport '{other}' is not compiled in (enable the '{}' feature)",
            other.feature()
        ))),
    }
}

/// Identity sent in the initialize request.
pub(crate) fn client_info() -> ClientInfo {
    ClientInfo {
        client_info: Implementation {
            name: "http-tool-proxy-client".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Implementation::from_build_env()
        },
        ..Default::default()
    }
}

/// Run the initialize exchange over an already opened transport.
pub(crate) async fn handshake<T, E, A>(
    kind: TransportKind,
    transport: T,
) -> Result<ClientService, SessionError>
where
    T: IntoTransport<RoleClient, E, A>,
    E: std::error::Error + Send + Sync + 'static,
{
    client_info()
        .into_dyn()
        .serve(transport)
        .await
        .map_err(|e| map_initialize_error(kind, e))
}

fn map_initialize_error(kind: TransportKind, error: ClientInitializeError) -> SessionError {
    match error {
        ClientInitializeError::TransportError { error, context } => {
            SessionError::connect(kind, format!("{context}: {error}"))
        }
        ClientInitializeError::ConnectionClosed(context) => {
            SessionError::Handshake(format!("connection closed during initialize: {context}"))
        }
        ClientInitializeError::JsonRpcError(error) => SessionError::Handshake(format!(
            "server rejected initialize ({}): {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => SessionError::Cancelled,
        other => SessionError::Handshake(other.to_string()),
    }
}
