//! Header policy for forwarded requests and relayed responses.
//!
//! # Outbound order
//! 1. `Content-Type` from the caller, or the configured default
//! 2. `Accept` and the fixed `User-Agent`
//! 3. every other inbound header not on the deny list
//!
//! Cookies and `Authorization` travel with rule 3 so the upstream sees the
//! caller's identity.

use std::collections::HashSet;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::config::{HeaderPolicyConfig, UpstreamConfig};
use crate::error::GatewayError;

/// Inbound headers that are recomputed for the outbound request. The body is
/// re-framed after buffering, so `transfer-encoding` goes with them.
const ALWAYS_DENIED: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Upstream headers that describe the upstream hop only.
const ALWAYS_STRIPPED: [HeaderName; 2] = [header::TRANSFER_ENCODING, header::CONNECTION];

/// Headers the policy sets itself rather than copying.
const MANAGED: [HeaderName; 3] = [header::CONTENT_TYPE, header::ACCEPT, header::USER_AGENT];

/// Allow/deny policy evaluated once per request.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    deny: HashSet<HeaderName>,
    strip_response: HashSet<HeaderName>,
    default_content_type: HeaderValue,
    accept: HeaderValue,
    user_agent: HeaderValue,
}

impl HeaderPolicy {
    pub fn from_config(
        upstream: &UpstreamConfig,
        config: &HeaderPolicyConfig,
    ) -> Result<Self, GatewayError> {
        let mut deny: HashSet<HeaderName> = ALWAYS_DENIED.into_iter().collect();
        for name in &config.deny {
            deny.insert(parse_name(name)?);
        }

        let mut strip_response: HashSet<HeaderName> = ALWAYS_STRIPPED.into_iter().collect();
        for name in &config.strip_response {
            strip_response.insert(parse_name(name)?);
        }

        Ok(Self {
            deny,
            strip_response,
            default_content_type: parse_value("upstream.default_content_type", &upstream.default_content_type)?,
            accept: parse_value("upstream.accept", &upstream.accept)?,
            user_agent: parse_value("upstream.user_agent", &upstream.user_agent)?,
        })
    }

    /// Build the header set sent upstream.
    pub fn outbound_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(inbound.keys_len() + MANAGED.len());

        let content_type = inbound
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| self.default_content_type.clone());
        headers.insert(header::CONTENT_TYPE, content_type);
        headers.insert(header::ACCEPT, self.accept.clone());
        headers.insert(header::USER_AGENT, self.user_agent.clone());

        for name in inbound.keys() {
            if MANAGED.contains(name) || self.deny.contains(name) {
                continue;
            }
            // keep every value of repeated headers (e.g. several cookies)
            for value in inbound.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        headers
    }

    /// Filter upstream response headers for relaying to the caller.
    pub fn relay_headers(&self, upstream: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(upstream.keys_len());
        for (name, value) in upstream {
            if !self.strip_response.contains(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers
    }
}

fn parse_name(name: &str) -> Result<HeaderName, GatewayError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| GatewayError::Header(format!("invalid header name `{name}`")))
}

fn parse_value(field: &str, value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::Header(format!("invalid value for `{field}`")))
}
