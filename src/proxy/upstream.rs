//! Outbound HTTP client for the upstream.
//!
//! # Responsibilities
//! - Own the single connection pool shared by every in-flight request
//! - Send a fully buffered request and buffer the full response
//! - Enforce the per-request deadline over send + body
//!
//! # Design Decisions
//! - Redirects are relayed to the caller, never followed
//! - Failures are classified, logged by the caller, and never retried

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::resilience::{with_deadline, TransportFailure};

/// A request ready to be sent upstream.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// `None` when the caller sent no body.
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// A complete upstream response, whatever its status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type UpstreamResult = Result<UpstreamResponse, TransportFailure>;

/// Shared upstream client. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .redirect(reqwest::redirect::Policy::none());
        if !upstream.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Send the request and wait for the full response body.
    pub async fn send(&self, request: ForwardedRequest) -> UpstreamResult {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        with_deadline(request.timeout, async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok(UpstreamResponse {
                status,
                headers,
                body,
            })
        })
        .await
    }
}
