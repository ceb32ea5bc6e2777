//! The forwarding gateway.
//!
//! Per request:
//! ```text
//! RouteMatched → HeadersBuilt → BodyBuffered → Forwarding
//!     → UpstreamSuccess → ResponseRelayed
//!     → UpstreamFailure → ErrorResponseSynthesized
//! ```
//!
//! Nothing here outlives a request. Dropping the future (client went away)
//! drops the outbound call with it.

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use http_body_util::LengthLimitError;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{RequestIdExt, X_REQUEST_ID};
use crate::http::response;
use crate::observability::metrics;
use crate::proxy::headers::HeaderPolicy;
use crate::proxy::upstream::{ForwardedRequest, UpstreamClient};
use crate::routing::{ProxyRoute, Router};

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Debug)]
pub struct Gateway {
    router: Router,
    headers: HeaderPolicy,
    client: UpstreamClient,
    timeout: Duration,
    max_body_bytes: usize,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let origin = Url::parse(&config.upstream.origin)?;

        Ok(Self {
            router: Router::from_config(&config.routes, &origin),
            headers: HeaderPolicy::from_config(&config.upstream, &config.headers)?,
            client: UpstreamClient::new(&config.upstream, &config.timeouts)?,
            timeout: Duration::from_secs(config.timeouts.request_secs),
            max_body_bytes: config.limits.max_body_bytes,
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Forward a request already matched to `route` and translate the outcome.
    pub async fn forward(&self, route: &ProxyRoute, request: Request<Body>) -> Response {
        let start_time = Instant::now();
        let request_id = request.request_id().to_string();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let Some(target) = route.target_url(&path, request.uri().query()) else {
            tracing::warn!(request_id = %request_id, method = %method, route = %route.name, path = %path, "Target escapes route prefix");
            metrics::record_request(method.as_str(), 400, &route.name, start_time);
            return response::bad_request("Request path leaves the route prefix");
        };

        let (parts, body) = request.into_parts();

        let mut headers = self.headers.outbound_headers(&parts.headers);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(X_REQUEST_ID.clone(), value);
        }

        if let Some(length) = declared_length(&parts.headers) {
            if length > self.max_body_bytes {
                tracing::warn!(request_id = %request_id, method = %method, length, limit = self.max_body_bytes, "Request body too large");
                metrics::record_request(method.as_str(), 413, &route.name, start_time);
                return response::payload_too_large(self.max_body_bytes);
            }
        }

        let body = match buffer_body(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(BodyError::TooLarge) => {
                tracing::warn!(request_id = %request_id, method = %method, limit = self.max_body_bytes, "Request body too large");
                metrics::record_request(method.as_str(), 413, &route.name, start_time);
                return response::payload_too_large(self.max_body_bytes);
            }
            Err(BodyError::Read(e)) => {
                tracing::warn!(request_id = %request_id, method = %method, error = %e, "Failed to read request body");
                metrics::record_request(method.as_str(), 400, &route.name, start_time);
                return response::bad_request("Failed to read request body");
            }
        };

        tracing::info!(
            request_id = %request_id,
            method = %method,
            route = %route.name,
            target = %target,
            body_bytes = body.len(),
            "Forwarding request"
        );

        let forwarded = ForwardedRequest {
            method: method.clone(),
            url: target.clone(),
            headers,
            body: (!body.is_empty()).then_some(body),
            timeout: self.timeout,
        };

        match self.client.send(forwarded).await {
            Ok(upstream) => {
                let status = upstream.status;
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    target = %target,
                    status = status.as_u16(),
                    body_bytes = upstream.body.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                metrics::record_request(method.as_str(), status.as_u16(), &route.name, start_time);
                response::relay(upstream, &self.headers)
            }
            Err(failure) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    target = %target,
                    kind = %failure.kind,
                    code = failure.code,
                    error = %failure.message,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Upstream request failed"
                );
                let response = response::transport_failure(&failure);
                metrics::record_transport_failure(failure.kind);
                metrics::record_request(method.as_str(), response.status().as_u16(), &route.name, start_time);
                response
            }
        }
    }
}

enum BodyError {
    TooLarge,
    Read(axum::Error),
}

async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            BodyError::TooLarge
        } else {
            BodyError::Read(e)
        }
    })
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn declared_length(headers: &axum::http::HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
