//! SSE transport implementation.
//!
//! The server-push stream transport. A client opens `GET /sse` and receives:
//!
//! 1. an `endpoint` event whose data is `/messages/?session_id=<id>`,
//! 2. one `message` event per server-to-client JSON-RPC message.
//!
//! Client-to-server messages are POSTed to that endpoint, one JSON-RPC message
//! per request, and answered with `202 Accepted`. Each event stream runs its
//! own rmcp service over a pair of in-memory channels; dropping the stream
//! tears the service down.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt, channel::mpsc};
use rmcp::ServiceExt;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::common;
use super::{MESSAGES_PATH, NetworkConfig, SSE_PATH, TransportError, TransportResult};
use crate::core::McpServer;

type SessionMap = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<ClientJsonRpcMessage>>>>;

/// Application state shared across SSE handlers.
#[derive(Clone)]
struct AppState {
    server: McpServer,
    sessions: SessionMap,
    ct: CancellationToken,
}

/// SSE transport handler.
pub struct SseTransport {
    config: NetworkConfig,
    ct: CancellationToken,
}

impl SseTransport {
    /// Create a new SSE transport with the given config.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ct: CancellationToken::new(),
        }
    }

    /// Stop serving (and end every open session) when `ct` is cancelled.
    pub fn with_cancellation(mut self, ct: CancellationToken) -> Self {
        self.ct = ct;
        self
    }

    /// Build the axum router without binding a socket.
    pub fn router(&self, server: McpServer) -> Router {
        let state = AppState {
            server,
            sessions: Arc::default(),
            ct: self.ct.clone(),
        };

        let app = Router::new()
            .route(SSE_PATH, get(open_stream))
            .route(MESSAGES_PATH, post(post_message))
            .with_state(state);
        common::finish_router(app, self.config.enable_cors)
    }

    /// Bind `host:port` and run the SSE transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let listener = common::bind(&self.config).await?;
        self.serve(listener, server).await
    }

    /// Run the SSE transport on an already bound listener.
    pub async fn serve(self, listener: TcpListener, server: McpServer) -> TransportResult<()> {
        let app = self.router(server);
        let addr = listener.local_addr().map_err(TransportError::Io)?;
        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (MCP over SSE, CORS {})", addr, cors_status);
        info!("  → Events:   GET {SSE_PATH}");
        info!("  → Messages: POST {MESSAGES_PATH}?session_id=...");

        let ct = self.ct.clone();
        common::serve(listener, app, async move { ct.cancelled_owned().await }).await
    }
}

/// `GET /sse` - open an event stream and start a server session behind it.
#[instrument(skip_all, fields(session_id))]
async fn open_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    tracing::Span::current().record("session_id", session_id.as_str());

    let (client_tx, client_rx) = mpsc::unbounded::<ClientJsonRpcMessage>();
    let (server_tx, server_rx) = mpsc::unbounded::<ServerJsonRpcMessage>();
    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), client_tx);
    info!("SSE session opened");

    let session_ct = state.ct.child_token();
    let task_ct = session_ct.clone();
    let sessions = state.sessions.clone();
    let id = session_id.clone();
    let server = state.server.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = task_ct.cancelled() => debug!(session_id = %id, "SSE session cancelled"),
            outcome = run_session(server, server_tx, client_rx) => {
                if let Err(e) = outcome {
                    warn!(session_id = %id, "SSE session ended with error: {}", e);
                }
            }
        }
        sessions.write().await.remove(&id);
        info!(session_id = %id, "SSE session closed");
    });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGES_PATH}?session_id={session_id}"));

    // Dropping the response stream (client went away) cancels the session.
    let guard = session_ct.drop_guard();
    let messages = server_rx.filter_map(move |message| {
        let _guard = &guard;
        let event = match serde_json::to_string(&message) {
            Ok(data) => Some(Ok(Event::default().event("message").data(data))),
            Err(e) => {
                warn!("Failed to encode server message: {}", e);
                None
            }
        };
        futures::future::ready(event)
    });

    let stream = futures::stream::once(futures::future::ready(Ok(endpoint))).chain(messages);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn run_session(
    server: McpServer,
    server_tx: mpsc::UnboundedSender<ServerJsonRpcMessage>,
    client_rx: mpsc::UnboundedReceiver<ClientJsonRpcMessage>,
) -> TransportResult<()> {
    let service = server
        .serve((server_tx, client_rx))
        .await
        .map_err(TransportError::session_start)?;
    service
        .waiting()
        .await
        .map_err(TransportError::stopped)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

/// `POST /messages/?session_id=<id>` - deliver one client message to its session.
#[instrument(skip_all)]
async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Response {
    let message: ClientJsonRpcMessage = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(session_id = %query.session_id, "Rejected malformed JSON-RPC message: {}", e);
            return (StatusCode::BAD_REQUEST, format!("invalid JSON-RPC message: {e}"))
                .into_response();
        }
    };

    let sessions = state.sessions.read().await;
    let Some(tx) = sessions.get(&query.session_id) else {
        debug!(session_id = %query.session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };
    if tx.unbounded_send(message).is_err() {
        return (StatusCode::NOT_FOUND, "session closed").into_response();
    }
    StatusCode::ACCEPTED.into_response()
}
