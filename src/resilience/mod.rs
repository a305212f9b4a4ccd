//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Conversion request:
//!     → circuit_breaker.rs (admit? Closed / Half-Open probe / reject)
//!     → rate cache lookup (refresh bounded by timeouts.rs)
//!     → circuit_breaker.rs (record latency into latency.rs, count outcome)
//!
//! Background refresh failure:
//!     → backoff.rs (jittered exponential delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; the feed call always has a deadline
//! - The breaker trips on hard failures and on degraded latency alike
//! - Breaker, tracker and cache are owned values, one set per service

pub mod backoff;
pub mod circuit_breaker;
pub mod latency;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use latency::LatencyTracker;
