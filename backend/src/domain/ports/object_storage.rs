//! Driven port for the object store holding batch files.
//!
//! The store has no rename and no index: listing by prefix is the only way to
//! discover objects, and every listing is capped by the caller.

use async_trait::async_trait;
use bytes::Bytes;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object storage adapters.
    pub enum ObjectStorageError {
        /// Upload failed; the object may not exist.
        Write { key: String, message: String } => "failed to write {key}: {message}",
        /// Download failed for a reason other than absence.
        Read { key: String, message: String } => "failed to read {key}: {message}",
        /// The object does not exist.
        NotFound { key: String } => "object {key} not found",
        /// Prefix enumeration failed.
        List { prefix: String, message: String } => "failed to list {prefix}: {message}",
        /// Removal failed.
        Delete { key: String, message: String } => "failed to delete {key}: {message}",
        /// The adapter could not be constructed from its settings.
        Configuration { message: String } => "object storage misconfigured: {message}",
        /// Server-side copy failed.
        Copy { from: String, to: String, message: String } =>
            "failed to copy {from} to {to}: {message}",
    }
}

/// Keys returned by a capped listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyListing {
    pub keys: Vec<String>,
    /// More keys existed under the prefix than the cap allowed.
    pub truncated: bool,
}

impl KeyListing {
    pub fn extend(&mut self, other: KeyListing) {
        self.keys.extend(other.keys);
        self.truncated |= other.truncated;
    }
}

/// Result of a bulk delete; failures are reported per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub failed: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `bytes` to `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), ObjectStorageError>;

    /// List at most `max_keys` keys starting with `prefix`.
    async fn list(&self, prefix: &str, max_keys: usize) -> Result<KeyListing, ObjectStorageError>;

    /// Download the whole object at `key`.
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStorageError>;

    /// Delete every key; individual failures land in [`DeleteSummary::failed`].
    async fn delete_many(&self, keys: &[String]) -> Result<DeleteSummary, ObjectStorageError>;

    /// Copy the object at `from` to `to`, leaving `from` in place.
    async fn copy(&self, from: &str, to: &str) -> Result<(), ObjectStorageError>;
}
