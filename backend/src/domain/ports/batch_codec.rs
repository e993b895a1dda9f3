//! Driven port serialising batches of records into single files.

use bytes::Bytes;

use crate::domain::{RecordColumns, StorageRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by batch codecs.
    pub enum BatchCodecError {
        Encode { message: String } => "failed to encode batch: {message}",
        Decode { message: String } => "failed to decode batch: {message}",
    }
}

/// Columnar file format used for batch files.
///
/// Implementations are CPU-bound and synchronous; callers run them on the
/// blocking thread pool.
#[cfg_attr(test, mockall::automock)]
pub trait BatchCodec: Send + Sync {
    /// Extension (without the dot) of files this codec produces.
    fn file_extension(&self) -> &'static str;

    fn encode(&self, records: &[StorageRecord]) -> Result<Vec<u8>, BatchCodecError>;

    fn decode(&self, bytes: Bytes) -> Result<RecordColumns, BatchCodecError>;
}
