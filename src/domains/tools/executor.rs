//! Invocation executor - performs the outbound HTTP call of a compiled adapter.
//!
//! The executor knows nothing about tools or parameters; it receives a fully
//! composed [`RequestPlan`] and maps the HTTP outcome to either the raw
//! response text or an [`UpstreamError`].

use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

use super::descriptor::HttpMethod;
use super::error::UpstreamError;

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub method: HttpMethod,
    /// URL with path placeholders already substituted.
    pub url: Url,
    /// Query string pairs, in parameter order.
    pub query: Vec<(String, String)>,
    /// JSON object body. Always `None` for GET and DELETE.
    pub body: Option<Map<String, Value>>,
    pub timeout: Duration,
}

/// Thin wrapper around a shared `reqwest::Client`.
///
/// Cloning is cheap; all adapters of a registry share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Issue exactly one HTTP request for the plan.
    ///
    /// Returns the response body text unmodified on success. Any status code
    /// >= 400 is an [`UpstreamError::Status`] carrying the body.
    #[instrument(skip_all, fields(method = %plan.method, url = %plan.url))]
    pub async fn execute(&self, plan: RequestPlan) -> Result<String, UpstreamError> {
        let started = Instant::now();

        let mut request = self
            .client
            .request(plan.method.as_reqwest(), plan.url)
            .timeout(plan.timeout);
        if !plan.query.is_empty() {
            request = request.query(&plan.query);
        }
        if let Some(body) = &plan.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, plan.timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, plan.timeout))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.as_u16() >= 400 {
            warn!(status = status.as_u16(), elapsed_ms, "Upstream returned an error status");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), elapsed_ms, bytes = body.len(), "Upstream call succeeded");
        Ok(body)
    }
}
