//! Client and server talking over MCP streamable HTTP.
#![cfg(feature = "http")]

mod common;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use http_tool_proxy::client::{self, ClientConfig, Session, SessionError, SessionState};
use http_tool_proxy::core::transport::http::HttpTransport;
use http_tool_proxy::core::transport::{NetworkConfig, TransportKind};

async fn start_server(upstream: &str) -> (ClientConfig, CancellationToken) {
    let (listener, port) = common::ephemeral_listener().await;
    let ct = CancellationToken::new();
    let transport =
        HttpTransport::new(NetworkConfig::new("127.0.0.1", port)).with_cancellation(ct.clone());
    tokio::spawn(transport.serve(listener, common::server_for(upstream)));

    let config = ClientConfig::new(TransportKind::StreamableRequest, "127.0.0.1", port)
        .with_connect_timeout(common::CONNECT_TIMEOUT);
    (config, ct)
}

#[tokio::test]
async fn test_discover_and_invoke() {
    let upstream = common::mock_upstream().await;
    let (config, ct) = start_server(&upstream.uri()).await;

    let mut session = Session::from_config(&config).unwrap();
    session.connect().await.unwrap();

    let tools = session.discover_tools().await.unwrap();
    assert_eq!(tools.len(), 2);
    let get = tools.iter().find(|t| t.name == "get_item").unwrap();
    assert_eq!(get.input_schema["properties"]["id"]["type"], json!("integer"));

    let text = session
        .invoke_tool("get_item", json!({ "id": "42" }).as_object().cloned().unwrap())
        .await
        .unwrap();
    assert_eq!(text, common::ITEM_BODY);

    session.close().await.unwrap();
    ct.cancel();
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected() {
    let upstream = common::mock_upstream().await;
    let (config, ct) = start_server(&upstream.uri()).await;

    let mut session = Session::from_config(&config).unwrap();
    session.connect().await.unwrap();

    let err = session
        .invoke_tool("get_item", json!({ "id": "forty-two" }).as_object().cloned().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ToolRejected { .. }), "got {err:?}");
    assert_eq!(session.state(), SessionState::Ready);

    // No outbound call was made for the rejected invocation.
    let requests = upstream.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());

    session.close().await.unwrap();
    ct.cancel();
}

#[tokio::test]
async fn test_scoped_helpers_match_session() {
    let upstream = common::mock_upstream().await;
    let (config, ct) = start_server(&upstream.uri()).await;

    let tools = client::discover(&config).await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["get_item", "create_item"]);

    let text = client::invoke(
        &config,
        "create_item",
        json!({ "name": "gadget", "price": 9.5 }).as_object().cloned().unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(text, "created");
    ct.cancel();
}

#[tokio::test]
async fn test_nothing_listening_fails_connect() {
    let (listener, port) = common::ephemeral_listener().await;
    drop(listener);
    let config = ClientConfig::new(TransportKind::StreamableRequest, "127.0.0.1", port);

    let mut session = Session::from_config(&config).unwrap();
    let err = session.connect().await.unwrap_err();
    assert!(err.is_fatal(), "got {err:?}");
    assert_eq!(session.state(), SessionState::Failed);
}
