//! Request middleware.
//!
//! Cross-cutting request concerns: trace correlation and per-client rate
//! limiting.

pub mod rate_limit;
pub mod trace;

pub use rate_limit::{RateLimit, RateLimiter};
pub use trace::Trace;
