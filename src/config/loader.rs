//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value `{value}` for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate.
///
/// Without a path the built-in defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply deployment overrides on top of a parsed configuration.
///
/// Recognised variables: `PORT`, `BIND_ADDRESS`, `UPSTREAM_URL`,
/// `REQUEST_TIMEOUT_SECS`, `MAX_BODY_BYTES`, `LOG_LEVEL`. `BIND_ADDRESS`
/// wins over `PORT` when both are set.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = parse_env("PORT", &port)?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(origin) = lookup("UPSTREAM_URL") {
        config.upstream.origin = origin;
    }
    if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS") {
        config.timeouts.request_secs = parse_env("REQUEST_TIMEOUT_SECS", &secs)?;
    }
    if let Some(bytes) = lookup("MAX_BODY_BYTES") {
        config.limits.max_body_bytes = parse_env("MAX_BODY_BYTES", &bytes)?;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}
