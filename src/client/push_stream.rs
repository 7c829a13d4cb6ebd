//! Push stream connector: the client half of the SSE transport.
//!
//! Opens `GET /sse`, waits for the `endpoint` event, then runs two helper
//! tasks: a reader that turns `message` events into incoming JSON-RPC
//! messages and a writer that POSTs outgoing messages to the endpoint. rmcp
//! sees the pair as an ordinary `(Sink, Stream)` transport. If the writer
//! stops, the reader stops with it so pending requests see a closed
//! connection instead of waiting on a stream that will never answer.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{StreamExt, stream::BoxStream};
use reqwest::header::ACCEPT;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use sse_stream::{Sse, SseStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use super::connector::{BackgroundTasks, Connection, Connector, handshake};
use super::error::SessionError;
use crate::core::transport::{SSE_PATH, TransportKind};

type EventStream = BoxStream<'static, Result<Sse, sse_stream::Error>>;

pub struct PushStreamConnector {
    base: Url,
    http: reqwest::Client,
}

impl PushStreamConnector {
    /// Connector for the server at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Result<Self, SessionError> {
        let base = Url::parse(base_url)
            .map_err(|e| SessionError::config(format!("invalid server URL '{base_url}': {e}")))?;
        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    fn stream_url(&self) -> Result<Url, SessionError> {
        self.base
            .join(SSE_PATH)
            .map_err(|e| SessionError::config(format!("invalid event stream URL: {e}")))
    }

    /// Read events until the server announces where to POST messages.
    async fn await_endpoint(&self, events: &mut EventStream) -> Result<Url, SessionError> {
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| SessionError::connect(self.kind(), e))?;
            if event.event.as_deref() != Some("endpoint") {
                continue;
            }
            let path = event.data.unwrap_or_default();
            return self.base.join(path.trim()).map_err(|e| {
                SessionError::Handshake(format!("invalid endpoint '{path}' announced by server: {e}"))
            });
        }
        Err(SessionError::Handshake(
            "event stream ended before the endpoint event".to_string(),
        ))
    }
}

#[async_trait]
impl Connector for PushStreamConnector {
    fn kind(&self) -> TransportKind {
        TransportKind::PushStream
    }

    fn target(&self) -> String {
        self.stream_url()
            .map(String::from)
            .unwrap_or_else(|_| self.base.to_string())
    }

    #[instrument(skip(self), fields(url = %self.target()))]
    async fn connect(&self) -> Result<Connection, SessionError> {
        let response = self
            .http
            .get(self.stream_url()?)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| SessionError::connect(self.kind(), e))?;
        if !response.status().is_success() {
            return Err(SessionError::connect(
                self.kind(),
                format!("event stream request returned HTTP {}", response.status()),
            ));
        }

        let mut events: EventStream = SseStream::from_bytes_stream(response.bytes_stream()).boxed();
        let endpoint = self.await_endpoint(&mut events).await?;
        debug!(%endpoint, "Message endpoint announced");

        let (in_tx, in_rx) = mpsc::unbounded::<ServerJsonRpcMessage>();
        let (out_tx, out_rx) = mpsc::unbounded::<ClientJsonRpcMessage>();

        let writer_done = CancellationToken::new();
        let mut tasks = BackgroundTasks::default();
        tasks.push(tokio::spawn(read_events(events, in_tx, writer_done.clone())));
        tasks.push(tokio::spawn(post_messages(
            self.http.clone(),
            endpoint,
            out_rx,
            writer_done,
        )));

        let service = handshake(self.kind(), (out_tx, in_rx)).await?;
        Ok(Connection::with_tasks(service, tasks))
    }
}

/// Forward `message` events to rmcp. Ends (closing the incoming side) when
/// the event stream ends or breaks, or when the writer has stopped.
async fn read_events(
    mut events: EventStream,
    incoming: mpsc::UnboundedSender<ServerJsonRpcMessage>,
    writer_done: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = writer_done.cancelled() => {
                debug!("Message writer gone, closing event stream");
                break;
            }
            event = events.next() => event,
        };
        let Some(event) = event else {
            break;
        };
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!("Event stream error: {}", e);
                break;
            }
        };
        if event.event.as_deref().unwrap_or("message") != "message" {
            continue;
        }
        let Some(data) = event.data.filter(|d| !d.trim().is_empty()) else {
            continue;
        };
        match serde_json::from_str::<ServerJsonRpcMessage>(&data) {
            Ok(message) => {
                if incoming.unbounded_send(message).is_err() {
                    break;
                }
            }
            Err(e) => warn!("Ignoring undecodable server message: {}", e),
        }
    }
    debug!("Event stream closed");
}

/// POST each outgoing message to the session endpoint. Stops at the first
/// failed delivery; `done` is cancelled on every exit path so the reader
/// closes the incoming side too.
async fn post_messages(
    http: reqwest::Client,
    endpoint: Url,
    mut outgoing: mpsc::UnboundedReceiver<ClientJsonRpcMessage>,
    done: CancellationToken,
) {
    let _done = done.drop_guard();
    while let Some(message) = outgoing.next().await {
        match http.post(endpoint.clone()).json(&message).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = response.status().as_u16(), "Server refused message");
                break;
            }
            Err(e) => {
                warn!("Failed to deliver message: {}", e);
                break;
            }
        }
    }
    debug!("Message writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::response::sse::{Event, Sse};
    use axum::routing::{get, post};
    use std::convert::Infallible;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Server whose event stream announces an endpoint and then stays open,
    /// while every POST to that endpoint fails.
    async fn refusing_server() -> String {
        let app = Router::new()
            .route(
                "/sse",
                get(|| async {
                    let endpoint = futures::stream::once(async {
                        Ok::<_, Infallible>(
                            Event::default().event("endpoint").data("/messages/?session_id=x"),
                        )
                    });
                    Sse::new(endpoint.chain(futures::stream::pending()))
                }),
            )
            .route("/messages/", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_stream_url() {
        let connector = PushStreamConnector::new("http://127.0.0.1:8080").unwrap();
        assert_eq!(connector.target(), "http://127.0.0.1:8080/sse");
        assert!(PushStreamConnector::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_error_status_is_connect_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let connector = PushStreamConnector::new(&server.uri()).unwrap();
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, SessionError::Connect { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_stream_without_endpoint_fails_handshake() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("event: message\ndata: {}\n\n"),
            )
            .mount(&server)
            .await;

        let connector = PushStreamConnector::new(&server.uri()).unwrap();
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, SessionError::Handshake(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_refused_post_fails_instead_of_hanging() {
        let base = refusing_server().await;
        let connector = PushStreamConnector::new(&base).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), connector.connect())
            .await
            .expect("connect should fail promptly when the server refuses messages");
        assert!(result.is_err());
    }
}
