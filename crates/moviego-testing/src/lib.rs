//! Test utilities for Moviego services.
//!
//! Request builders that attach a peer address (the rate limiter needs one),
//! bearer tokens and JSON bodies, plus response body decoding.
//! Import in tests only, never in production code.

pub mod request;
pub mod response;

pub use request::TestRequest;
pub use response::{body_bytes, body_json};
