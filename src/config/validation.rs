//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, body limit)
//! - Validate the upstream origin and header names
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{GatewayConfig, RewriteMode};

/// Upper bound for the upstream deadline.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("invalid upstream origin `{origin}`: {reason}")]
    UpstreamOrigin { origin: String, reason: String },

    #[error("no routes configured")]
    NoRoutes,

    #[error("route `{route}`: prefix `{prefix}` must start with `/`")]
    RoutePrefix { route: String, prefix: String },

    #[error("route `{route}`: prefix `{prefix}` is already used by another route")]
    DuplicatePrefix { route: String, prefix: String },

    #[error("route `{route}`: rewrite = \"replace\" needs a replacement starting with `/`")]
    MissingReplacement { route: String },

    #[error("request timeout must be between 1 and {MAX_REQUEST_TIMEOUT_SECS} seconds, got {0}")]
    RequestTimeout(u64),

    #[error("connect timeout must be greater than zero")]
    ConnectTimeout,

    #[error("max_body_bytes must be greater than zero")]
    BodyLimit,

    #[error("invalid header name `{0}`")]
    HeaderName(String),

    #[error("invalid value for `{field}`")]
    HeaderValue { field: &'static str },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if let Err(reason) = check_origin(&config.upstream.origin) {
        errors.push(ValidationError::UpstreamOrigin {
            origin: config.upstream.origin.clone(),
            reason,
        });
    }

    validate_routes(config, &mut errors);

    if config.timeouts.request_secs == 0 || config.timeouts.request_secs > MAX_REQUEST_TIMEOUT_SECS {
        errors.push(ValidationError::RequestTimeout(config.timeouts.request_secs));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ConnectTimeout);
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    for name in config.headers.deny.iter().chain(&config.headers.strip_response) {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }

    let values: [(&'static str, &str); 6] = [
        ("upstream.user_agent", &config.upstream.user_agent),
        ("upstream.accept", &config.upstream.accept),
        ("upstream.default_content_type", &config.upstream.default_content_type),
        ("cors.allow_origin", &config.cors.allow_origin),
        ("cors.allow_methods", &config.cors.allow_methods),
        ("cors.allow_headers", &config.cors.allow_headers),
    ];
    for (field, value) in values {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::HeaderValue { field });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routes(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
        return;
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::RoutePrefix {
                route: route.name.clone(),
                prefix: route.prefix.clone(),
            });
        }

        let normalized = route.prefix.trim_end_matches('/');
        if !seen.insert(normalized.to_string()) {
            errors.push(ValidationError::DuplicatePrefix {
                route: route.name.clone(),
                prefix: route.prefix.clone(),
            });
        }

        if route.rewrite == RewriteMode::Replace
            && !route
                .replacement
                .as_deref()
                .is_some_and(|r| r.starts_with('/'))
        {
            errors.push(ValidationError::MissingReplacement {
                route: route.name.clone(),
            });
        }
    }
}

fn check_origin(origin: &str) -> Result<(), String> {
    let url = Url::parse(origin).map_err(|e| e.to_string())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.path() != "/" {
        return Err("origin must not carry a path".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("origin must not carry a query or fragment".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.limits.max_body_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::RequestTimeout(0)));
        assert!(errors.contains(&ValidationError::BodyLimit));
    }

    #[test]
    fn rejects_origin_with_path() {
        let mut config = GatewayConfig::default();
        config.upstream.origin = "https://automation.example.com/webhook".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::UpstreamOrigin { .. }));
    }

    #[test]
    fn rejects_non_http_origin() {
        let mut config = GatewayConfig::default();
        config.upstream.origin = "ftp://files.example.com".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_and_malformed_prefixes() {
        let mut config = GatewayConfig::default();
        config.routes = vec![
            RouteConfig::new("a", "/webhook", RewriteMode::Preserve),
            RouteConfig::new("b", "/webhook/", RewriteMode::Strip),
            RouteConfig::new("c", "proxy", RewriteMode::Strip),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicatePrefix { route, .. } if route == "b")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RoutePrefix { route, .. } if route == "c")));
    }

    #[test]
    fn replace_requires_replacement() {
        let mut config = GatewayConfig::default();
        config.routes = vec![RouteConfig::new("api", "/api/webhook", RewriteMode::Replace)];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingReplacement { route: "api".into() }]
        );
    }

    #[test]
    fn rejects_bad_header_names() {
        let mut config = GatewayConfig::default();
        config.headers.deny.push("bad header".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::HeaderName("bad header".into())]);
    }
}
