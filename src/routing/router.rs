//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Longest prefix wins, so nested prefixes never shadow each other
//! - Explicit `None` rather than silent default

use url::Url;

use crate::config::{RewriteMode, RouteConfig};
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::rewrite::PathRewrite;

/// A compiled route: inbound prefix, upstream origin and rewrite policy.
#[derive(Debug, Clone)]
pub struct ProxyRoute {
    pub name: String,
    matcher: PathPrefixMatcher,
    rewrite: PathRewrite,
    /// Upstream prefix the final URL must stay under.
    outbound: PathPrefixMatcher,
    origin: String,
}

impl ProxyRoute {
    pub fn new(config: &RouteConfig, origin: &Url) -> Self {
        let rewrite = match config.rewrite {
            RewriteMode::Preserve => PathRewrite::Preserve,
            RewriteMode::Strip => PathRewrite::Strip,
            RewriteMode::Replace => {
                PathRewrite::Replace(config.replacement.clone().unwrap_or_default())
            }
        };

        let outbound = PathPrefixMatcher::new(rewrite.outbound_prefix(&config.prefix));

        Self {
            name: config.name.clone(),
            matcher: PathPrefixMatcher::new(config.prefix.as_str()),
            rewrite,
            outbound,
            origin: origin.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// The upstream path for a matched inbound path.
    pub fn rewrite_path(&self, path: &str) -> Option<String> {
        let remainder = self.matcher.remainder(path)?;
        Some(self.rewrite.apply(path, remainder))
    }

    /// Full upstream URL: origin + rewritten path + original query.
    ///
    /// `None` when the path does not match, or when URL normalization would
    /// move the target out from under the route's upstream prefix.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Option<String> {
        let path = self.rewrite_path(path)?;
        let raw = match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.origin, path, q),
            _ => format!("{}{}", self.origin, path),
        };

        let url = Url::parse(&raw).ok()?;
        if !self.outbound.matches(url.path()) {
            return None;
        }
        Some(url.into())
    }
}

/// The compiled route table.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<ProxyRoute>,
}

impl Router {
    /// Compile routes from configuration against the upstream origin.
    pub fn from_config(routes: &[RouteConfig], origin: &Url) -> Self {
        let mut routes: Vec<ProxyRoute> = routes
            .iter()
            .map(|config| ProxyRoute::new(config, origin))
            .collect();
        routes.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));

        for route in &routes {
            tracing::debug!(route = %route.name, prefix = %route.prefix(), rewrite = ?route.rewrite, "Route compiled");
        }

        Self { routes }
    }

    /// Find the route owning `path`.
    pub fn match_path(&self, path: &str) -> Option<&ProxyRoute> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }
}
