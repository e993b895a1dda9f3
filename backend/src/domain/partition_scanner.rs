//! Enumerates batch files by date or by user and reads them back.
//!
//! Listing failures are fatal to the caller. Download and decode failures
//! affect only the file concerned: it is logged, counted, and skipped.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ports::{BatchCodec, KeyListing, ObjectStorage, ObjectStorageError};
use super::{DateRange, ObjectKey, RecordColumns, TraceId, WorkerPool, day_prefix};

/// Merged contents of the files read by a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    pub columns: RecordColumns,
    pub files_read: usize,
    pub files_failed: usize,
    /// At least one listing hit its cap.
    pub truncated: bool,
}

#[derive(Clone)]
pub struct PartitionScanner {
    storage: Arc<dyn ObjectStorage>,
    codec: Arc<dyn BatchCodec>,
    pool: WorkerPool,
    day_cap: usize,
}

impl PartitionScanner {
    /// `day_cap` bounds the keys listed for any single day prefix.
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        codec: Arc<dyn BatchCodec>,
        pool: WorkerPool,
        day_cap: usize,
    ) -> Self {
        Self {
            storage,
            codec,
            pool,
            day_cap,
        }
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    fn is_batch_file(&self, key: &str) -> bool {
        key.rsplit_once('.')
            .is_some_and(|(_, ext)| ext == self.codec.file_extension())
    }

    /// List batch files for every day in `range`, one day prefix at a time.
    pub async fn list_range(&self, range: &DateRange) -> Result<KeyListing, ObjectStorageError> {
        let mut listing = KeyListing::default();
        for day in range.days() {
            let prefix = day_prefix(day);
            let mut found = self.storage.list(&prefix, self.day_cap).await?;
            if found.truncated {
                warn!(prefix = %prefix, cap = self.day_cap, "day listing truncated");
            }
            found.keys.retain(|key| self.is_batch_file(key));
            listing.extend(found);
        }
        Ok(listing)
    }

    /// List up to `cap` keys across all partitions and keep every object whose
    /// user segment equals `user`, whatever its extension.
    pub async fn list_user_objects(
        &self,
        user: &str,
        cap: usize,
    ) -> Result<KeyListing, ObjectStorageError> {
        let mut listing = self.storage.list("", cap).await?;
        if listing.truncated {
            warn!(user = %user, cap, "user scan reached its cap; results may be incomplete");
        }
        listing
            .keys
            .retain(|key| ObjectKey::parse(key).is_some_and(|k| k.belongs_to(user)));
        Ok(listing)
    }

    /// Like [`Self::list_user_objects`], restricted to batch files.
    pub async fn list_user_keys(
        &self,
        user: &str,
        cap: usize,
    ) -> Result<KeyListing, ObjectStorageError> {
        let mut listing = self.list_user_objects(user, cap).await?;
        listing.keys.retain(|key| self.is_batch_file(key));
        Ok(listing)
    }

    /// Download and decode `keys` through the worker pool.
    pub async fn fetch(&self, keys: Vec<String>) -> ScanOutput {
        let storage = Arc::clone(&self.storage);
        let codec = Arc::clone(&self.codec);
        let results = self
            .pool
            .run_all(keys, |key| {
                let storage = Arc::clone(&storage);
                let codec = Arc::clone(&codec);
                async move {
                    let outcome = read_file(storage, codec, &key).await;
                    (key, outcome)
                }
            })
            .await;

        let mut output = ScanOutput::default();
        for (key, outcome) in results {
            match outcome {
                Ok(columns) => {
                    output.files_read += 1;
                    output.columns.append(columns);
                }
                Err(message) => {
                    output.files_failed += 1;
                    warn!(key = %key, error = %message, "skipping unreadable batch file");
                }
            }
        }
        debug!(
            files_read = output.files_read,
            files_failed = output.files_failed,
            rows = output.columns.len(),
            "scan complete"
        );
        output
    }

    /// List and read every batch file in `range`.
    pub async fn scan_range(&self, range: &DateRange) -> Result<ScanOutput, ObjectStorageError> {
        let listing = self.list_range(range).await?;
        let mut output = self.fetch(listing.keys).await;
        output.truncated = listing.truncated;
        Ok(output)
    }
}

async fn read_file(
    storage: Arc<dyn ObjectStorage>,
    codec: Arc<dyn BatchCodec>,
    key: &str,
) -> Result<RecordColumns, String> {
    let bytes = storage.get(key).await.map_err(|err| err.to_string())?;
    tokio::task::spawn_blocking(TraceId::propagate_blocking(move || codec.decode(bytes)))
        .await
        .map_err(|err| err.to_string())?
        .map_err(|err| err.to_string())
}
