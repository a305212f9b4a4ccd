//! Currency conversion gateway library.
//!
//! A single `/convert` endpoint backed by a cached exchange-rate table. The
//! table is loaded from one upstream feed and guarded by an adaptive circuit
//! breaker that trips on consecutive failures or degraded tail latency.

pub mod admin;
pub mod config;
pub mod conversion;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rates;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use conversion::Converter;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rates::RateCache;
pub use resilience::CircuitBreaker;
