//! Driving port for accepting submissions.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{ContentHash, Error, Submitter, SubmissionDraft, SubmissionValidationError};

/// Request to store one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub submitter: Submitter,
    pub draft: SubmissionDraft,
}

/// Request to store several submissions sharing one batch context.
///
/// Context entries are copied into each item's metadata unless the item
/// already sets that key.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitBatchRequest {
    pub submitter: Submitter,
    pub context: Map<String, Value>,
    pub items: Vec<SubmissionDraft>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Accepted,
    /// Reserved; the write path stores every submission and never reports it.
    Duplicate,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Duplicate => "duplicate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: SubmissionStatus,
    pub id: Uuid,
    pub hash: ContentHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every item was stored.
    Completed,
    /// At least one item was rejected.
    Partial,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
        }
    }
}

/// Outcome of one batch item, keyed by its position in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItemOutcome {
    Accepted {
        index: usize,
        id: Uuid,
        hash: ContentHash,
    },
    Rejected {
        index: usize,
        error: SubmissionValidationError,
    },
}

impl BatchItemOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Accepted { index, .. } | Self::Rejected { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReceipt {
    pub status: BatchStatus,
    /// Number of items stored.
    pub submitted: usize,
    pub results: Vec<BatchItemOutcome>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionCommand: Send + Sync {
    async fn submit(&self, request: SubmitRequest) -> Result<SubmissionReceipt, Error>;

    async fn submit_batch(&self, request: SubmitBatchRequest) -> Result<BatchReceipt, Error>;
}

/// Command that accepts everything without storing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSubmissionCommand;

fn fixture_hash(draft: &SubmissionDraft) -> ContentHash {
    ContentHash::compute(&draft.model_id, &draft.prompt_id, &draft.output)
}

#[async_trait]
impl SubmissionCommand for FixtureSubmissionCommand {
    async fn submit(&self, request: SubmitRequest) -> Result<SubmissionReceipt, Error> {
        Ok(SubmissionReceipt {
            status: SubmissionStatus::Accepted,
            id: Uuid::nil(),
            hash: fixture_hash(&request.draft),
        })
    }

    async fn submit_batch(&self, request: SubmitBatchRequest) -> Result<BatchReceipt, Error> {
        let results: Vec<_> = request
            .items
            .iter()
            .enumerate()
            .map(|(index, draft)| BatchItemOutcome::Accepted {
                index,
                id: Uuid::nil(),
                hash: fixture_hash(draft),
            })
            .collect();
        Ok(BatchReceipt {
            status: BatchStatus::Completed,
            submitted: results.len(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_batch_accepts_every_item() {
        let receipt = FixtureSubmissionCommand
            .submit_batch(SubmitBatchRequest {
                submitter: Submitter::Anonymous,
                context: Map::new(),
                items: vec![SubmissionDraft::default(), SubmissionDraft::default()],
            })
            .await
            .expect("fixture accepts");
        assert_eq!(receipt.status, BatchStatus::Completed);
        assert_eq!(receipt.submitted, 2);
        assert_eq!(receipt.results[1].index(), 1);
    }

    #[rstest]
    fn statuses_render_lowercase() {
        assert_eq!(SubmissionStatus::Duplicate.as_str(), "duplicate");
        assert_eq!(BatchStatus::Partial.as_str(), "partial");
    }
}
