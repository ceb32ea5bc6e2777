//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce one deadline over send + full body)
//!     → On failure: classify into Timeout / ConnectionReset / Other
//!     → Report once (no retry)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: forwarded methods are arbitrary and idempotency is unknown
//! - Failure kinds are distinct so they map to distinct status codes

pub mod timeouts;

pub use timeouts::{with_deadline, TransportFailure, TransportFailureKind};
