//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (global token bucket, 429 when empty)
//!     → Pass to handler
//!
//! Admin request:
//!     → admin::auth (bearer token check)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
