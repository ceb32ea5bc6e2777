//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (assign/propagate request ID)
//!     → /health → health.rs
//!     → OPTIONS under a route prefix → preflight answer
//!     → other routed paths → proxy::Gateway::forward
//!     → response.rs (relay or synthesize error)
//!     → CORS headers stamped → Send to client
//! ```

pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
