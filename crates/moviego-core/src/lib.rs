//! HTTP plumbing shared by Moviego services.
//!
//! The request pipeline pieces that do not need a user store live here:
//! panic recovery, CORS, per-client rate limiting, metrics, the JSON envelope,
//! and the supervisor for detached background work.

pub mod background;
pub mod cors;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod serde;
pub mod tracing;
