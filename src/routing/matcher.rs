//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries: `/webhook` matches `/webhook`
//!   and `/webhook/abc` but neither `/webhooks` nor `/webhook-test`
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing `/` is ignored, so `/`
    /// itself matches every path.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the path falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        self.remainder(path).is_some()
    }

    /// The part of `path` after the prefix (empty or starting with `/`).
    pub fn remainder<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// True if any segment of `path` is `.` or `..`, plain or percent-encoded.
/// URL parsing collapses such segments, so they could climb out of a prefix.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}
