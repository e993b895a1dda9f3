//! Outbound adapters implementing driven ports.
//!
//! - **storage**: S3-compatible or in-memory object storage via `object_store`
//! - **codec**: Parquet batch files via `arrow` and `parquet`
//! - **identity**: bearer-token verification from a static token table
//!
//! Adapters translate between domain types and infrastructure
//! representations; they hold no business rules.

pub mod codec;
pub mod identity;
pub mod storage;
