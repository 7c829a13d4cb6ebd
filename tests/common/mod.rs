//! Shared fixtures for the client/server round-trip tests.

#![allow(dead_code)]

use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use http_tool_proxy::core::{Config, McpServer};

pub const ITEM_BODY: &str = "{\"id\":42,\"name\":\"widget\"}";
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream HTTP service the proxied tools call.
pub async fn mock_upstream() -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ITEM_BODY))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/items/0"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such item"))
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(body_json(json!({ "name": "gadget", "price": 9.5 })))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&upstream)
        .await;
    upstream
}

/// Config document with two tools pointing at `base`.
pub fn config_yaml(base: &str) -> String {
    format!(
        r#"
tools:
  - name: get_item
    description: Fetch one item
    url: {base}/items/{{id}}
    path_params:
      id: int
  - name: create_item
    description: Create an item
    method: POST
    url: {base}/items
    body_params:
      name: str
      price: float
logging:
  level: debug
"#
    )
}

pub fn server_for(base: &str) -> McpServer {
    let config = Config::from_yaml_str(&config_yaml(base)).expect("valid test config");
    McpServer::new(config).expect("tools compile")
}

/// Listener on an ephemeral loopback port.
pub async fn ephemeral_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}
