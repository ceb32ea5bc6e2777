//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS headers)
//! - Answer CORS preflights under route prefixes
//! - Dispatch routed requests to the forwarding gateway
//! - Serve until the shutdown signal, then drain in-flight requests

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::{CorsConfig, GatewayConfig};
use crate::error::GatewayError;
use crate::http::health::health;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response;
use crate::observability::metrics;
use crate::proxy::Gateway;
use crate::routing::has_dot_segment;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub preflight_max_age_secs: u64,
    /// Port the listener is bound to, reported by `/health`.
    pub port: u16,
}

/// The three CORS headers stamped on every response.
#[derive(Debug, Clone)]
struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    fn from_config(config: &CorsConfig) -> Result<Self, GatewayError> {
        let parse = |field: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|_| GatewayError::Header(format!("invalid value for `cors.{field}`")))
        };
        Ok(Self {
            allow_origin: parse("allow_origin", &config.allow_origin)?,
            allow_methods: parse("allow_methods", &config.allow_methods)?,
            allow_headers: parse("allow_headers", &config.allow_headers)?,
        })
    }

    fn layer(name: HeaderName, value: &HeaderValue) -> SetResponseHeaderLayer<HeaderValue> {
        SetResponseHeaderLayer::overriding(name, value.clone())
    }
}

/// HTTP server for the webhook gateway.
pub struct GatewayServer {
    config: GatewayConfig,
    gateway: Arc<Gateway>,
    cors: CorsHeaders,
}

impl GatewayServer {
    /// Create a new server; builds the route table, header policy and the
    /// shared upstream client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let gateway = Arc::new(Gateway::new(&config)?);
        let cors = CorsHeaders::from_config(&config.cors)?;

        Ok(Self {
            config,
            gateway,
            cors,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self, port: u16) -> Router {
        let state = AppState {
            gateway: self.gateway.clone(),
            preflight_max_age_secs: self.config.cors.max_age_secs,
            port,
        };

        Router::new()
            .route("/health", get(health))
            .fallback(gateway_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(CorsHeaders::layer(
                        header::ACCESS_CONTROL_ALLOW_ORIGIN,
                        &self.cors.allow_origin,
                    ))
                    .layer(CorsHeaders::layer(
                        header::ACCESS_CONTROL_ALLOW_METHODS,
                        &self.cors.allow_methods,
                    ))
                    .layer(CorsHeaders::layer(
                        header::ACCESS_CONTROL_ALLOW_HEADERS,
                        &self.cors.allow_headers,
                    )),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), GatewayError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin,
            routes = self.gateway.router().routes().len(),
            "HTTP server starting"
        );

        let app = self.router(addr.port());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

}

/// Catch-all handler: preflight, forward, or refuse.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    if has_dot_segment(&path) {
        tracing::warn!(request_id = %request.request_id(), method = %request.method(), path = %path, "Rejected dot segment in path");
        return response::bad_request("Request path must not contain dot segments");
    }

    let Some(route) = state.gateway.router().match_path(&path) else {
        tracing::debug!(
            request_id = %request.request_id(),
            method = %request.method(),
            path = %path,
            "No route matched"
        );
        return response::route_not_found(&path);
    };

    if request.method() == Method::OPTIONS {
        tracing::debug!(request_id = %request.request_id(), route = %route.name, path = %path, "Answering preflight");
        metrics::record_preflight(&route.name);
        return response::preflight(state.preflight_max_age_secs);
    }

    state.gateway.forward(route, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> GatewayServer {
        let mut config = GatewayConfig::default();
        // nothing listens here; preflight and routing must not need it
        config.upstream.origin = "http://127.0.0.1:9".into();
        GatewayServer::new(config).unwrap()
    }

    #[tokio::test]
    async fn preflight_is_answered_locally() {
        let app = server().router(3000);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/webhook/abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[tokio::test]
    async fn unmatched_path_is_404_with_cors() {
        let app = server().router(3000);
        let response = app
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn health_reports_port() {
        let app = server().router(4321);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["port"], 4321);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn dot_segment_path_is_rejected() {
        let app = server().router(3000);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/webhook/%2e%2e/rest/credentials")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn caller_request_id_is_echoed() {
        let app = server().router(3000);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nowhere")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }
}
