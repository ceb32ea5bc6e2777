//! Buffered forwarding to the upstream.
//!
//! # Data Flow
//! ```text
//! Routed request
//!     → headers.rs (outbound header set from the allow/deny policy)
//!     → forward.rs (buffer body, build ForwardedRequest)
//!     → upstream.rs (shared client, deadline, buffered response)
//!     → http::response (relay or synthesize 502/504)
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered in both directions; payloads may be binary and
//!   chunked relaying is not worth the integrity risk
//! - One upstream, one client, one pool
//! - No retries

pub mod forward;
pub mod headers;
pub mod upstream;

pub use forward::Gateway;
pub use headers::HeaderPolicy;
pub use upstream::{ForwardedRequest, UpstreamClient, UpstreamResponse, UpstreamResult};
