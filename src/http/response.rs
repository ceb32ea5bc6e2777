//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay a buffered upstream response to the caller
//! - Map transport failures to structured JSON error responses
//! - Answer CORS preflights and requests the gateway refuses
//!
//! # Design Decisions
//! - Upstream status codes are relayed verbatim, 4xx/5xx included
//! - Hop-by-hop headers stripped by the header policy
//! - Timeouts and resets result in 504 Gateway Timeout, other transport
//!   errors in 502 Bad Gateway
//! - CORS headers are stamped by the router layer, not here

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::proxy::headers::HeaderPolicy;
use crate::proxy::upstream::UpstreamResponse;
use crate::resilience::TransportFailure;

/// Relay an upstream response: status verbatim, filtered headers, body bytes.
pub fn relay(upstream: UpstreamResponse, policy: &HeaderPolicy) -> Response {
    let headers = policy.relay_headers(&upstream.headers);

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    response
}

/// Synthesize the response for a failed upstream call.
pub fn transport_failure(failure: &TransportFailure) -> Response {
    if failure.kind.is_gateway_timeout() {
        (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({
                "error": "Gateway Timeout",
                "message": failure.message,
                "code": failure.code,
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "Proxy Error",
                "message": bad_gateway_message(failure.code),
                "details": failure.message,
                "code": failure.code,
            })),
        )
            .into_response()
    }
}

fn bad_gateway_message(code: &str) -> &'static str {
    match code {
        "ECONNREFUSED" | "ENOTFOUND" | "ETLS" | "ECONNECT" => "Could not connect to the webhook server.",
        "EBODY" => "The webhook server sent a response that could not be read.",
        _ => "The request to the webhook server failed.",
    }
}

pub fn payload_too_large(limit: usize) -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({
            "error": "Payload Too Large",
            "message": format!("request body exceeds {limit} bytes"),
        })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Bad Request",
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn route_not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "No matching route found",
            "path": path,
        })),
    )
        .into_response()
}

/// Empty 200 answer to a CORS preflight.
pub fn preflight(max_age_secs: u64) -> Response {
    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age_secs));
    response
}
