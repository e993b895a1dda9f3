//! Ingestion and partitioned-storage backend for crowdsourced LLM outputs.
//!
//! Submissions are written as immutable Parquet batch files under
//! `year=/month=/day=/user=` prefixes of an S3-compatible bucket. Crowd
//! statistics, personal statistics, and data-rights requests are answered by
//! scanning those prefixes.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
