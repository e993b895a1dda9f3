//! Accepts single and batch submissions and writes them as batch files.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{error, info};

use super::batch_writer::{BatchWriteError, BatchWriter};
use super::ports::{
    BatchItemOutcome, BatchReceipt, BatchStatus, SubmissionCommand, SubmissionReceipt,
    SubmissionStatus, SubmitBatchRequest, SubmitRequest,
};
use super::submission::{RecordBuilder, Submission, SubmissionValidationError};
use super::{Error, storage_unavailable};

/// Largest number of items accepted in one batch request.
pub const MAX_BATCH_ITEMS: usize = 1000;

/// Map a rejected draft to an `invalid_request` error with field details.
pub fn validation_error(err: &SubmissionValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({
        "field": err.field().as_str(),
        "code": err.code(),
    }))
}

fn write_error(err: BatchWriteError) -> Error {
    match err {
        BatchWriteError::Storage(err) => storage_unavailable(err),
        other => {
            error!(error = %other, "failed to encode batch file");
            Error::internal("failed to encode batch file")
        }
    }
}

/// Implements [`SubmissionCommand`] on top of a [`BatchWriter`].
///
/// Write-time deduplication is not performed: every valid submission is
/// stored and reported as accepted, with its content hash returned so
/// clients can detect repeats themselves.
#[derive(Clone)]
pub struct SubmissionService {
    writer: BatchWriter,
    clock: Arc<dyn Clock>,
    builder: RecordBuilder,
}

impl SubmissionService {
    pub fn new(writer: BatchWriter, clock: Arc<dyn Clock>) -> Self {
        Self {
            writer,
            clock,
            builder: RecordBuilder,
        }
    }
}

#[async_trait]
impl SubmissionCommand for SubmissionService {
    async fn submit(&self, request: SubmitRequest) -> Result<SubmissionReceipt, Error> {
        let submission =
            Submission::try_from(request.draft).map_err(|err| validation_error(&err))?;
        let record = self
            .builder
            .build(&submission, &request.submitter, self.clock.utc());
        let hash = record.output_hash;

        let ids = self.writer.write(vec![record]).await.map_err(write_error)?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| Error::internal("batch writer returned no id"))?;
        Ok(SubmissionReceipt {
            status: SubmissionStatus::Accepted,
            id,
            hash,
        })
    }

    async fn submit_batch(&self, request: SubmitBatchRequest) -> Result<BatchReceipt, Error> {
        let SubmitBatchRequest {
            submitter,
            context,
            items,
        } = request;
        if items.is_empty() {
            return Err(Error::invalid_request("results must not be empty")
                .with_details(json!({"field": "results", "code": "empty"})));
        }
        if items.len() > MAX_BATCH_ITEMS {
            return Err(Error::invalid_request(format!(
                "results must contain at most {MAX_BATCH_ITEMS} items"
            ))
            .with_details(json!({"field": "results", "code": "too_many"})));
        }

        let now = self.clock.utc();
        let mut records = Vec::with_capacity(items.len());
        let mut accepted_indices = Vec::with_capacity(items.len());
        let mut results = Vec::new();

        for (index, mut draft) in items.into_iter().enumerate() {
            for (key, value) in &context {
                draft
                    .metadata
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
            match Submission::try_from(draft) {
                Ok(submission) => {
                    records.push(self.builder.build(&submission, &submitter, now));
                    accepted_indices.push(index);
                }
                Err(error) => results.push(BatchItemOutcome::Rejected { index, error }),
            }
        }

        let hashes: Vec<_> = records.iter().map(|record| record.output_hash).collect();
        let ids = self.writer.write(records).await.map_err(write_error)?;
        let submitted = ids.len();
        results.extend(
            accepted_indices
                .into_iter()
                .zip(ids.into_iter().zip(hashes))
                .map(|(index, (id, hash))| BatchItemOutcome::Accepted { index, id, hash }),
        );
        results.sort_by_key(BatchItemOutcome::index);

        let status = if submitted == results.len() {
            BatchStatus::Completed
        } else {
            BatchStatus::Partial
        };
        info!(
            submitter = %submitter,
            submitted,
            rejected = results.len() - submitted,
            "batch submission processed"
        );
        Ok(BatchReceipt {
            status,
            submitted,
            results,
        })
    }
}

#[cfg(test)]
#[path = "submission_service_tests.rs"]
mod tests;
