//! Prefix rewrite policies.
//!
//! A rewrite is applied to the remainder left after the route prefix has
//! been matched, so it is total over matched paths and never sees anything
//! else.

/// Transformation from an inbound path to the upstream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRewrite {
    /// `/webhook/abc` → `/webhook/abc`.
    Preserve,
    /// `/proxy/webhook/abc` → `/webhook/abc`.
    Strip,
    /// `/api/webhook/abc` → `/webhook/abc` with replacement `/webhook`.
    Replace(String),
}

impl PathRewrite {
    /// Rewrite `path`, whose matched prefix left `remainder` behind.
    pub fn apply(&self, path: &str, remainder: &str) -> String {
        let rewritten = match self {
            PathRewrite::Preserve => path.to_string(),
            PathRewrite::Strip => remainder.to_string(),
            PathRewrite::Replace(replacement) => {
                format!("{}{}", replacement.trim_end_matches('/'), remainder)
            }
        };

        if rewritten.is_empty() {
            "/".to_string()
        } else {
            rewritten
        }
    }

    /// The upstream prefix every rewritten path stays under.
    pub fn outbound_prefix(&self, prefix: &str) -> String {
        match self {
            PathRewrite::Preserve => prefix.to_string(),
            PathRewrite::Strip => "/".to_string(),
            PathRewrite::Replace(replacement) => replacement.clone(),
        }
    }
}
