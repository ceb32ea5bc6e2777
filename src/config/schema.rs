//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the webhook gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every route forwards to.
    pub upstream: UpstreamConfig,

    /// Route definitions: inbound prefix plus rewrite policy.
    pub routes: Vec<RouteConfig>,

    /// Request/response header policy.
    pub headers: HeaderPolicyConfig,

    /// CORS headers stamped on every response.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: default_routes(),
            headers: HeaderPolicyConfig::default(),
            cors: CorsConfig::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Upstream (automation webhook host) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin the rewritten path is appended to (scheme + host + optional port).
    pub origin: String,

    /// Fixed `User-Agent` sent on every forwarded request.
    pub user_agent: String,

    /// `Accept` sent on every forwarded request.
    pub accept: String,

    /// `Content-Type` used when the inbound request has none.
    pub default_content_type: String,

    /// Route upstream calls through `HTTP_PROXY`/`HTTPS_PROXY` when set.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:5678".to_string(),
            user_agent: concat!("webhook-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
            accept: "application/json, text/plain, */*".to_string(),
            default_content_type: "application/json".to_string(),
            use_system_proxy: false,
        }
    }
}

/// How a matched prefix is rewritten before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Forward the inbound path unchanged.
    #[default]
    Preserve,
    /// Drop the matched prefix, keep the remainder.
    Strip,
    /// Swap the matched prefix for `replacement`.
    Replace,
}

/// Route configuration: one inbound prefix forwarded to the upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Inbound path prefix to match (segment aligned).
    pub prefix: String,

    /// Rewrite policy applied to matched paths.
    #[serde(default)]
    pub rewrite: RewriteMode,

    /// Replacement prefix, required when `rewrite = "replace"`.
    #[serde(default)]
    pub replacement: Option<String>,
}

impl RouteConfig {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, rewrite: RewriteMode) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            rewrite,
            replacement: None,
        }
    }

    pub fn replacing(
        name: impl Into<String>,
        prefix: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            rewrite: RewriteMode::Replace,
            replacement: Some(replacement.into()),
        }
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("webhook", "/webhook", RewriteMode::Preserve),
        RouteConfig::new("webhook-test", "/webhook-test", RewriteMode::Preserve),
        RouteConfig::replacing("api-webhook", "/api/webhook", "/webhook"),
        RouteConfig::new("proxy", "/proxy", RewriteMode::Strip),
    ]
}

/// Header policy configuration.
///
/// `host`, `connection` and `content-length` are always withheld from the
/// upstream and `transfer-encoding`/`connection` are always dropped from the
/// relayed response; these lists only add to that.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Extra inbound request headers never forwarded upstream.
    pub deny: Vec<String>,

    /// Extra upstream response headers never relayed to the caller.
    pub strip_response: Vec<String>,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            // remaining hop-by-hop headers
            deny: ["keep-alive", "proxy-connection", "te", "trailer", "upgrade"]
                .into_iter()
                .map(String::from)
                .collect(),
            strip_response: Vec::new(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,

    /// `Access-Control-Max-Age` sent on preflight answers.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, PATCH, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
            max_age_secs: 86_400,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream deadline (send + full response body) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
