//! Transport-agnostic client session.
//!
//! A [`Session`] owns exactly one connection made by its [`Connector`] and
//! walks the state machine
//!
//! ```text
//! Unconnected -> Connecting -> Ready -> Closed
//!                     |          |
//!                     +-> Failed <+
//! ```
//!
//! `Failed` is terminal: there is no reconnect in place, callers build a new
//! session. Operations take `&mut self`, so requests on one session can never
//! be pipelined. `close` consumes the session; dropping an unclosed session
//! still tears the connection down.

use futures::future::{BoxFuture, FutureExt};
use rmcp::model::{CallToolRequestParams, CallToolResult, JsonObject, RawContent, Tool};
use rmcp::service::ServiceError;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT};
use super::connector::{ClientService, Connection, Connector, connector_for};
use super::error::SessionError;
use crate::core::transport::TransportKind;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unconnected,
    Connecting,
    Ready,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Closed => "closed",
            Self::Failed => "failed",
        })
    }
}

/// A tool as advertised by the remote server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteTool {
    pub name: String,
    pub description: String,
    pub input_schema: JsonObject,
}

impl From<Tool> for RemoteTool {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
            input_schema: (*tool.input_schema).clone(),
        }
    }
}

/// Lets another task close a session, aborting whatever it is doing.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A client connection to the tool server over one transport.
pub struct Session {
    connector: Box<dyn Connector>,
    state: SessionState,
    connection: Option<Connection>,
    cancel: CancellationToken,
    connect_timeout: Duration,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.connector.kind())
            .field("target", &self.connector.target())
            .field("state", &self.state)
            .finish()
    }
}

impl Session {
    /// Create an unconnected session around `connector`.
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            state: SessionState::Unconnected,
            connection: None,
            cancel: CancellationToken::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create an unconnected session for the configured transport.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SessionError> {
        Ok(Self::new(connector_for(config)?).with_connect_timeout(config.connect_timeout))
    }

    /// Bound on connect plus handshake.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transport(&self) -> TransportKind {
        self.connector.kind()
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            token: self.cancel.clone(),
        }
    }

    /// Open the transport and run the initialize handshake.
    ///
    /// Only valid on an unconnected session. Any failure, including the
    /// connect timeout, leaves the session `Failed`.
    #[instrument(skip(self), fields(transport = %self.connector.kind(), target = %self.connector.target()))]
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Unconnected {
            return Err(SessionError::NotReady {
                operation: "connect",
                state: self.state,
            });
        }
        self.state = SessionState::Connecting;

        let timeout = self.connect_timeout;
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            res = tokio::time::timeout(timeout, self.connector.connect()) => match res {
                Ok(res) => res,
                Err(_) => Err(SessionError::Handshake(format!(
                    "no initialize response within {timeout:?}"
                ))),
            },
        };

        match outcome {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = SessionState::Ready;
                info!("Session ready");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                warn!("Session failed to connect: {}", e);
                Err(e)
            }
        }
    }

    /// List the tools of the remote registry, verbatim and in order.
    #[instrument(skip(self), fields(transport = %self.connector.kind()))]
    pub async fn discover_tools(&mut self) -> Result<Vec<RemoteTool>, SessionError> {
        let service = self.ready_service("discover tools")?;
        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            res = service.list_all_tools() => res.map_err(|e| map_service_error(None, e)),
        };

        let tools = self.settle(outcome)?;
        debug!(count = tools.len(), "Tools discovered");
        Ok(tools.into_iter().map(RemoteTool::from).collect())
    }

    /// Call a remote tool and return the text of its result.
    ///
    /// A result flagged as an error becomes [`SessionError::ToolFailed`]; a
    /// protocol-level rejection becomes [`SessionError::ToolRejected`]. Neither
    /// affects the session state.
    #[instrument(skip(self, arguments), fields(transport = %self.connector.kind()))]
    pub async fn invoke_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<String, SessionError> {
        let service = self.ready_service("invoke a tool")?;
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(arguments),
            task: None,
        };
        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            res = service.call_tool(params) => res.map_err(|e| map_service_error(Some(name), e)),
        };

        let result = self.settle(outcome)?;
        let text = result_text(&result);
        if result.is_error.unwrap_or(false) {
            return Err(SessionError::ToolFailed {
                tool: name.to_string(),
                message: text,
            });
        }
        Ok(text)
    }

    /// Close the session and release its transport.
    ///
    /// Consumes the session, so it runs at most once per session.
    pub async fn close(mut self) -> Result<(), SessionError> {
        let previous = self.state;
        self.state = SessionState::Closed;
        let outcome = match self.connection.take() {
            Some(connection) => connection.close().await,
            None => Ok(()),
        };
        info!(transport = %self.connector.kind(), from = %previous, "Session closed");
        outcome
    }

    fn ready_service(&self, operation: &'static str) -> Result<&ClientService, SessionError> {
        match (&self.connection, self.state) {
            (Some(connection), SessionState::Ready) => Ok(connection.service()),
            (_, state) => Err(SessionError::NotReady { operation, state }),
        }
    }

    /// Apply the state transition implied by an operation's outcome.
    fn settle<T>(&mut self, outcome: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &outcome {
            if e.is_fatal() {
                warn!("Session failed: {}", e);
                self.state = SessionState::Failed;
                // Dropping the connection cancels the service and its helper tasks.
                self.connection = None;
            }
        }
        outcome
    }
}

fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| match &content.raw {
            RawContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect()
}

fn map_service_error(tool: Option<&str>, error: ServiceError) -> SessionError {
    match (error, tool) {
        (ServiceError::McpError(error), Some(tool)) => SessionError::ToolRejected {
            tool: tool.to_string(),
            message: error.message.to_string(),
        },
        (ServiceError::McpError(error), None) => {
            SessionError::Rejected(format!("{} ({})", error.message, error.code.0))
        }
        (ServiceError::TransportClosed, _) => {
            SessionError::Transport("connection closed by peer".to_string())
        }
        (ServiceError::TransportSend(error), _) => {
            SessionError::Transport(format!("send failed: {error}"))
        }
        (ServiceError::Cancelled { .. }, _) => SessionError::Cancelled,
        (other, _) => SessionError::Transport(other.to_string()),
    }
}

// ============================================================================
// Scoped helpers
// ============================================================================

/// Connect `session`, run `op` on it, and close it on every exit path.
pub async fn run_scoped<T, F>(mut session: Session, op: F) -> Result<T, SessionError>
where
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, SessionError>>,
{
    let outcome = match session.connect().await {
        Ok(()) => op(&mut session).await,
        Err(e) => Err(e),
    };
    let closed = session.close().await;
    let value = outcome?;
    closed?;
    Ok(value)
}

/// Open a fresh session for `config`, run `op`, then close the session.
pub async fn with_session<T, F>(config: &ClientConfig, op: F) -> Result<T, SessionError>
where
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, SessionError>>,
{
    run_scoped(Session::from_config(config)?, op).await
}

/// One connect-discover cycle.
pub async fn discover(config: &ClientConfig) -> Result<Vec<RemoteTool>, SessionError> {
    with_session(config, |session| session.discover_tools().boxed()).await
}

/// One connect-invoke cycle.
pub async fn invoke(
    config: &ClientConfig,
    name: impl Into<String>,
    arguments: JsonObject,
) -> Result<String, SessionError> {
    let name = name.into();
    with_session(config, move |session| {
        async move { session.invoke_tool(&name, arguments).await }.boxed()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{
        FailingConnector, InProcessConnector, SilentConnector, upstream_server,
    };
    use crate::core::McpServer;
    use crate::core::config::Config;
    use crate::domains::tools::{ToolDescriptor, ToolRegistry};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    async fn ready_session(upstream: &MockServer) -> (Session, InProcessConnector) {
        let connector = InProcessConnector::new(upstream_server(&upstream.uri()));
        let mut session = Session::new(Box::new(connector.clone()));
        session.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        (session, connector)
    }

    #[tokio::test]
    async fn test_failed_handshake_never_reaches_ready() {
        let mut session = Session::new(Box::new(FailingConnector));
        assert_eq!(session.state(), SessionState::Unconnected);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::Handshake(_)));
        assert_eq!(session.state(), SessionState::Failed);

        let err = session.discover_tools().await.unwrap_err();
        assert!(matches!(err, SessionError::NotReady { state: SessionState::Failed, .. }));
        let err = session.invoke_tool("get_item", JsonObject::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotReady { .. }));

        // No reconnect in place.
        assert!(session.connect().await.is_err());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_server_times_out_instead_of_hanging() {
        let mut session = Session::new(Box::new(SilentConnector::default()))
            .with_connect_timeout(Duration::from_millis(200));
        let err = tokio::time::timeout(Duration::from_secs(5), session.connect())
            .await
            .expect("connect must not hang")
            .unwrap_err();
        assert!(matches!(err, SessionError::Handshake(_)), "got {err:?}");
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_operations_before_connect_are_rejected() {
        let mut session = Session::new(Box::new(FailingConnector));
        let err = session.discover_tools().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotReady { state: SessionState::Unconnected, .. }
        ));
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let upstream = MockServer::start().await;
        let (mut session, _) = ready_session(&upstream).await;

        let first = session.discover_tools().await.unwrap();
        let second = session.discover_tools().await.unwrap();
        assert_eq!(first, second);

        let names: Vec<_> = first.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_item", "create_item"]);
        let get_item = first.iter().find(|t| t.name == "get_item").unwrap();
        assert_eq!(get_item.input_schema["required"], json!(["id"]));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_discovery_keeps_config_order() {
        let names = ["zeta", "alpha", "mike", "bravo", "yankee", "charlie"];
        let registry = ToolRegistry::from_descriptors(names.iter().map(|name| {
            ToolDescriptor::new(*name, "Lookup", format!("http://localhost/{name}"))
                .with_query_param("q", "string")
        }))
        .unwrap();
        let server = McpServer::from_registry(Config::default(), registry);

        let mut session = Session::new(Box::new(InProcessConnector::new(server)));
        session.connect().await.unwrap();
        let tools = session.discover_tools().await.unwrap();
        let got: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(got, names);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_invoke_returns_raw_text() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ \"id\": 42 }"))
            .mount(&upstream)
            .await;

        let (mut session, _) = ready_session(&upstream).await;
        let text = session
            .invoke_tool("get_item", args(json!({ "id": 42 })))
            .await
            .unwrap();
        assert_eq!(text, "{ \"id\": 42 }");
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_upstream_error_is_tool_failure_and_session_survives() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&upstream)
            .await;

        let (mut session, _) = ready_session(&upstream).await;
        let err = session
            .invoke_tool("get_item", args(json!({ "id": 1 })))
            .await
            .unwrap_err();
        match &err {
            SessionError::ToolFailed { tool, message } => {
                assert_eq!(tool, "get_item");
                assert!(message.contains("500"), "{message}");
                assert!(message.contains("boom"), "{message}");
            }
            other => panic!("expected tool failure, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.discover_tools().await.is_ok());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments_are_rejected() {
        let upstream = MockServer::start().await;
        let (mut session, _) = ready_session(&upstream).await;

        let err = session.invoke_tool("nope", JsonObject::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::ToolRejected { .. }), "got {err:?}");

        let err = session.invoke_tool("get_item", JsonObject::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::ToolRejected { .. }), "got {err:?}");

        assert_eq!(session.state(), SessionState::Ready);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_handle_aborts_outstanding_call() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&upstream)
            .await;

        let (mut session, _) = ready_session(&upstream).await;
        let handle = session.close_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.close();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(3),
            session.invoke_tool("get_item", args(json!({ "id": 7 }))),
        )
        .await
        .expect("close must abort the call")
        .unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        assert_eq!(session.state(), SessionState::Failed);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_loss_fails_session() {
        let upstream = MockServer::start().await;
        let (mut session, connector) = ready_session(&upstream).await;

        connector.shutdown_server();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = session.discover_tools().await.unwrap_err();
        assert!(err.is_fatal(), "got {err:?}");
        assert_eq!(session.state(), SessionState::Failed);

        let err = session.discover_tools().await.unwrap_err();
        assert!(matches!(err, SessionError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_scoped_session_closes_on_error_path() {
        let upstream = MockServer::start().await;
        let connector = InProcessConnector::new(upstream_server(&upstream.uri()));
        let session = Session::new(Box::new(connector.clone()));

        let err = run_scoped(session, |s| {
            async move { s.invoke_tool("nope", JsonObject::new()).await }.boxed()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::ToolRejected { .. }));

        // The server side sees the connection go away.
        tokio::time::timeout(Duration::from_secs(3), async {
            while connector.finished_servers.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("server session should end after close");
    }

    #[tokio::test]
    async fn test_scoped_session_reports_connect_failure() {
        let err = run_scoped(Session::new(Box::new(FailingConnector)), |s| {
            s.discover_tools().boxed()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::Handshake(_)));
    }
}
