//! Writes a batch of records as one file in its partition.

use std::sync::Arc;

use bytes::Bytes;
use mockable::Clock;
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::{BatchCodec, BatchCodecError, ObjectStorage, ObjectStorageError};
use super::{NewRecord, StorageRecord, TraceId};

#[derive(Debug, thiserror::Error)]
pub enum BatchWriteError {
    #[error(transparent)]
    Codec(#[from] BatchCodecError),
    #[error(transparent)]
    Storage(#[from] ObjectStorageError),
    #[error("batch encoding task failed: {0}")]
    Task(String),
}

/// Serialises records into a single batch file and uploads it.
///
/// Every call performs at most one upload. The partition comes from the
/// first record; callers never mix partitions within one call.
#[derive(Clone)]
pub struct BatchWriter {
    storage: Arc<dyn ObjectStorage>,
    codec: Arc<dyn BatchCodec>,
    clock: Arc<dyn Clock>,
}

impl BatchWriter {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        codec: Arc<dyn BatchCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            codec,
            clock,
        }
    }

    /// Assign ids, encode, and upload. Returns ids in input order.
    pub async fn write(&self, records: Vec<NewRecord>) -> Result<Vec<Uuid>, BatchWriteError> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        let partition = first.partition();

        let stored: Vec<StorageRecord> = records
            .into_iter()
            .map(|record| record.with_id(Uuid::new_v4()))
            .collect();
        let ids: Vec<Uuid> = stored.iter().map(|record| record.id).collect();

        let Some(first_id) = ids.first().copied() else {
            return Ok(ids);
        };
        let file_name = self.file_name(first_id);
        let key = partition.object_key(&file_name);

        let codec = Arc::clone(&self.codec);
        let encode = TraceId::propagate_blocking(move || codec.encode(&stored));
        let encoded = tokio::task::spawn_blocking(encode)
            .await
            .map_err(|err| BatchWriteError::Task(err.to_string()))??;
        debug!(key = %key, bytes = encoded.len(), "encoded batch file");

        self.storage.put(&key, Bytes::from(encoded)).await?;
        info!(key = %key, records = ids.len(), "stored batch file");
        Ok(ids)
    }

    fn file_name(&self, first_id: Uuid) -> String {
        let fragment: String = first_id
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();
        format!(
            "pramana_{}_{}.{}",
            self.clock.utc().format("%Y%m%d_%H%M%S"),
            fragment,
            self.codec.file_extension()
        )
    }
}
