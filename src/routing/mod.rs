//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (route lookup, longest prefix first)
//!     → matcher.rs (segment-aligned prefix match)
//!     → rewrite.rs (preserve / strip / replace)
//!     → Return: matched ProxyRoute + upstream URL, or no match
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile matchers and rewrite policies
//!     → Sort by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - The rewrite policy is explicit per route, never inferred

pub mod matcher;
pub mod rewrite;
pub mod router;

pub use matcher::has_dot_segment;
pub use rewrite::PathRewrite;
pub use router::{ProxyRoute, Router};
