//! Pieces shared by the network transports.

use axum::{Json, Router, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{NetworkConfig, TransportError, TransportResult};

/// Bind the listener for a network transport.
pub(crate) async fn bind(config: &NetworkConfig) -> TransportResult<TcpListener> {
    let addr = config.address();
    TcpListener::bind(&addr)
        .await
        .map_err(|e| TransportError::bind(&addr, e))
}

/// Add `/health`, request tracing and (optionally) permissive CORS.
pub(crate) fn finish_router(router: Router, enable_cors: bool) -> Router {
    let mut app = router
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    app
}

/// Serve `app` on `listener` until `shutdown` completes.
pub(crate) async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> TransportResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("  → Health:   GET http://{addr}/health");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(TransportError::stopped)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
