//! Erasure and anonymisation of every object in one user's partitions.
//!
//! Both operations work file by file over a capped listing. A failure on
//! one file is logged and counted; files already processed stay processed.

use async_trait::async_trait;
use tracing::{info, warn};

use super::partition_scanner::PartitionScanner;
use super::ports::{DataRightsAction, DataRightsCommand, DataRightsOutcome};
use super::{ANONYMOUS_USER, Error, ObjectKey, UserId, storage_unavailable};

/// Implements [`DataRightsCommand`] using copy and delete on the object store.
#[derive(Clone)]
pub struct DataRightsOperator {
    scanner: PartitionScanner,
    scan_cap: usize,
}

impl DataRightsOperator {
    pub fn new(scanner: PartitionScanner, scan_cap: usize) -> Self {
        Self { scanner, scan_cap }
    }

    /// Move every object under user `from` to the same place under user `to`.
    ///
    /// Bytes are preserved exactly: each file is copied to its new key, then
    /// the original is deleted.
    pub async fn repartition(
        &self,
        from: &str,
        to: &str,
        action: DataRightsAction,
    ) -> Result<DataRightsOutcome, Error> {
        if from == to {
            return Err(Error::invalid_request(
                "source and destination partitions must differ",
            ));
        }
        let listing = self
            .scanner
            .list_user_objects(from, self.scan_cap)
            .await
            .map_err(storage_unavailable)?;
        let storage = self.scanner.storage();

        let mut outcome = DataRightsOutcome::empty(action);
        outcome.truncated = listing.truncated;
        for key in listing.keys {
            let Some(parsed) = ObjectKey::parse(&key) else {
                continue;
            };
            let destination = parsed.with_user(to).as_key();
            if let Err(err) = storage.copy(&key, &destination).await {
                warn!(
                    key = %key,
                    error = %err,
                    kind = err.kind(),
                    "failed to copy file during repartition"
                );
                outcome.files_failed += 1;
                continue;
            }
            match storage.delete_many(std::slice::from_ref(&key)).await {
                Ok(summary) if summary.failed.is_empty() => outcome.files_affected += 1,
                Ok(_) => {
                    warn!(key = %key, "copied file but failed to delete original");
                    outcome.files_failed += 1;
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "copied file but failed to delete original");
                    outcome.files_failed += 1;
                }
            }
        }

        info!(
            files_moved = outcome.files_affected,
            files_failed = outcome.files_failed,
            truncated = outcome.truncated,
            "repartition finished"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl DataRightsCommand for DataRightsOperator {
    async fn erase(&self, user: &UserId) -> Result<DataRightsOutcome, Error> {
        let listing = self
            .scanner
            .list_user_objects(user.as_ref(), self.scan_cap)
            .await
            .map_err(storage_unavailable)?;

        let mut outcome = DataRightsOutcome::empty(DataRightsAction::Deleted);
        outcome.truncated = listing.truncated;
        if listing.keys.is_empty() {
            return Ok(outcome);
        }

        let summary = self
            .scanner
            .storage()
            .delete_many(&listing.keys)
            .await
            .map_err(storage_unavailable)?;
        for key in &summary.failed {
            warn!(key = %key, "failed to delete file during erasure");
        }
        outcome.files_affected = summary.deleted;
        outcome.files_failed = summary.failed.len();
        info!(
            files_deleted = outcome.files_affected,
            files_failed = outcome.files_failed,
            truncated = outcome.truncated,
            "user data erased"
        );
        Ok(outcome)
    }

    async fn anonymize(&self, user: &UserId) -> Result<DataRightsOutcome, Error> {
        self.repartition(user.as_ref(), ANONYMOUS_USER, DataRightsAction::Anonymized)
            .await
    }
}
