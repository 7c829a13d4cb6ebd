//! Client spawning the compiled binary as a stdio server.
#![cfg(feature = "stdio")]

mod common;

use serde_json::json;
use std::io::Write;
use std::path::Path;

use http_tool_proxy::client::{
    self, ClientConfig, ServerCommand, Session, SessionError, SessionState,
};
use http_tool_proxy::core::transport::TransportKind;

const BINARY: &str = env!("CARGO_BIN_EXE_http-tool-proxy");

fn client_config(config_path: &Path) -> ClientConfig {
    ClientConfig::new(TransportKind::LocalPipe, "localhost", 0)
        .with_connect_timeout(common::CONNECT_TIMEOUT)
        .with_server_command(ServerCommand::serve_stdio(BINARY, Some(config_path)))
}

fn write_config(upstream: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(common::config_yaml(upstream).as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_discover_and_invoke_over_child_process() {
    let upstream = common::mock_upstream().await;
    let file = write_config(&upstream.uri());
    let config = client_config(file.path());

    let mut session = Session::from_config(&config).unwrap();
    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    let tools = session.discover_tools().await.unwrap();
    assert_eq!(tools.len(), 2);

    let text = session
        .invoke_tool("get_item", json!({ "id": 42 }).as_object().cloned().unwrap())
        .await
        .unwrap();
    assert_eq!(text, common::ITEM_BODY);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_each_operation_gets_its_own_process() {
    let upstream = common::mock_upstream().await;
    let file = write_config(&upstream.uri());
    let config = client_config(file.path());

    let first = client::discover(&config).await.unwrap();
    let second = client::discover(&config).await.unwrap();
    assert_eq!(first, second);

    let err = client::invoke(&config, "get_item", json!({ "id": 0 }).as_object().cloned().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ToolFailed { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_server_with_bad_config_fails_handshake() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    // Path parameter without a placeholder: the server refuses to start.
    file.write_all(
        b"tools:\n  - name: broken\n    description: x\n    url: http://localhost/items\n    path_params:\n      id: int\n",
    )
    .unwrap();
    let config = client_config(file.path());

    let mut session = Session::from_config(&config).unwrap();
    let err = session.connect().await.unwrap_err();
    assert!(err.is_fatal(), "got {err:?}");
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_missing_binary_is_connect_error() {
    let config = ClientConfig::new(TransportKind::LocalPipe, "localhost", 0).with_server_command(
        ServerCommand::new("/nonexistent/http-tool-proxy", Vec::<String>::new()),
    );
    let err = client::discover(&config).await.unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }), "got {err:?}");
}
