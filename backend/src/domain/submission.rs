//! Submissions and the records built from them.
//!
//! A [`SubmissionDraft`] arrives from an inbound adapter, is validated into a
//! [`Submission`], and the [`RecordBuilder`] turns it into a [`NewRecord`]
//! ready for the batch writer. The writer assigns the record id, producing a
//! [`StorageRecord`].

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::identity::Submitter;
use super::partition::PartitionKey;

/// Maximum characters accepted for `model_id` and `prompt_id`.
pub const ID_MAX_CHARS: usize = 256;
/// Maximum UTF-8 bytes accepted for `output`.
pub const OUTPUT_MAX_BYTES: usize = 512 * 1024;

/// Algorithm name prefixed to every rendered content hash.
pub const HASH_ALGORITHM: &str = "sha256";

/// Fields of a submission subject to validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionField {
    ModelId,
    PromptId,
    Output,
}

impl SubmissionField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelId => "model_id",
            Self::PromptId => "prompt_id",
            Self::Output => "output",
        }
    }
}

/// Reasons a [`SubmissionDraft`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionValidationError {
    #[error("{} must not be empty", field.as_str())]
    Empty { field: SubmissionField },
    #[error("{} must be at most {max} characters", field.as_str())]
    TooLong { field: SubmissionField, max: usize },
    #[error("output must be at most {max} bytes")]
    OutputTooLarge { max: usize },
}

impl SubmissionValidationError {
    pub fn field(&self) -> SubmissionField {
        match self {
            Self::Empty { field } | Self::TooLong { field, .. } => *field,
            Self::OutputTooLarge { .. } => SubmissionField::Output,
        }
    }

    /// Stable machine-readable code used in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "empty",
            Self::TooLong { .. } => "too_long",
            Self::OutputTooLarge { .. } => "too_large",
        }
    }
}

/// Unvalidated submission as decoded from a request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionDraft {
    pub model_id: String,
    pub prompt_id: String,
    pub output: String,
    pub metadata: Map<String, Value>,
}

/// A submission whose identifiers and output satisfy the size bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    model_id: String,
    prompt_id: String,
    output: String,
    metadata: Map<String, Value>,
}

fn validate_id(field: SubmissionField, value: &str) -> Result<(), SubmissionValidationError> {
    if value.trim().is_empty() {
        return Err(SubmissionValidationError::Empty { field });
    }
    if value.chars().count() > ID_MAX_CHARS {
        return Err(SubmissionValidationError::TooLong {
            field,
            max: ID_MAX_CHARS,
        });
    }
    Ok(())
}

impl TryFrom<SubmissionDraft> for Submission {
    type Error = SubmissionValidationError;

    fn try_from(draft: SubmissionDraft) -> Result<Self, Self::Error> {
        let SubmissionDraft {
            model_id,
            prompt_id,
            output,
            metadata,
        } = draft;
        validate_id(SubmissionField::ModelId, &model_id)?;
        validate_id(SubmissionField::PromptId, &prompt_id)?;
        if output.len() > OUTPUT_MAX_BYTES {
            return Err(SubmissionValidationError::OutputTooLarge {
                max: OUTPUT_MAX_BYTES,
            });
        }
        Ok(Self {
            model_id,
            prompt_id,
            output,
            metadata,
        })
    }
}

impl Submission {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn prompt_id(&self) -> &str {
        &self.prompt_id
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// SHA-256 fingerprint of `(model_id, prompt_id, output)`.
///
/// # Examples
/// ```
/// use pramana::domain::ContentHash;
///
/// let a = ContentHash::compute("gpt", "p1", "hello");
/// let b = ContentHash::compute("gpt", "p1", "hello");
/// assert_eq!(a, b);
/// assert!(a.to_string().starts_with("sha256:"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Digest the pipe-joined triple.
    pub fn compute(model_id: &str, prompt_id: &str, output: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model_id.as_bytes());
        hasher.update(b"|");
        hasher.update(prompt_id.as_bytes());
        hasher.update(b"|");
        hasher.update(output.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{HASH_ALGORITHM}:{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Record awaiting an id from the batch writer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub model_id: String,
    pub prompt_id: String,
    pub output: String,
    pub output_hash: ContentHash,
    pub metadata_json: String,
}

impl NewRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Partition this record is stored under.
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.date(), self.user_id.clone())
    }

    pub fn with_id(self, id: Uuid) -> StorageRecord {
        StorageRecord { id, record: self }
    }
}

/// One persisted row of a batch file.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRecord {
    pub id: Uuid,
    pub record: NewRecord,
}

impl StorageRecord {
    pub fn year(&self) -> i32 {
        self.record.timestamp.year()
    }

    pub fn month(&self) -> i32 {
        self.record.timestamp.month() as i32
    }

    pub fn day(&self) -> i32 {
        self.record.timestamp.day() as i32
    }
}

/// Turns validated submissions into records.
///
/// Pure and infallible: the same inputs always produce the same record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordBuilder;

impl RecordBuilder {
    pub fn build(
        &self,
        submission: &Submission,
        submitter: &Submitter,
        now: DateTime<Utc>,
    ) -> NewRecord {
        NewRecord {
            timestamp: now,
            user_id: submitter.partition_value().to_owned(),
            model_id: submission.model_id.clone(),
            prompt_id: submission.prompt_id.clone(),
            output: submission.output.clone(),
            output_hash: ContentHash::compute(
                &submission.model_id,
                &submission.prompt_id,
                &submission.output,
            ),
            metadata_json: Value::Object(submission.metadata.clone()).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::domain::identity::{ANONYMOUS_USER, UserId};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("valid instant")
    }

    #[fixture]
    fn submission() -> Submission {
        let mut metadata = Map::new();
        metadata.insert("temperature".into(), json!(0.2));
        Submission::try_from(SubmissionDraft {
            model_id: "gpt-4o".into(),
            prompt_id: "math-001".into(),
            output: "42".into(),
            metadata,
        })
        .expect("valid draft")
    }

    #[rstest]
    fn hash_matches_known_digest() {
        let hash = ContentHash::compute("a", "b", "c");
        assert_eq!(
            hash.to_string(),
            "sha256:a52dd81bfd5e4e66d96b9f598382f6cbf8c5c3897654e6ae9055e03620fcf38e"
        );
    }

    #[rstest]
    fn hash_separates_fields() {
        assert_ne!(
            ContentHash::compute("ab", "c", "d"),
            ContentHash::compute("a", "bc", "d")
        );
    }

    #[rstest]
    fn builders_agree_on_hash(submission: Submission, now: DateTime<Utc>) {
        let first = RecordBuilder.build(&submission, &Submitter::Anonymous, now);
        let second = RecordBuilder::default().build(&submission, &Submitter::Anonymous, now);
        assert_eq!(first.output_hash, second.output_hash);
    }

    #[rstest]
    fn anonymous_submitter_is_recorded_as_sentinel(submission: Submission, now: DateTime<Utc>) {
        let record = RecordBuilder.build(&submission, &Submitter::Anonymous, now);
        assert_eq!(record.user_id, ANONYMOUS_USER);
        assert_eq!(record.partition().user(), ANONYMOUS_USER);
    }

    #[rstest]
    fn authenticated_submitter_is_recorded(submission: Submission, now: DateTime<Utc>) {
        let user = UserId::new("user-1").expect("valid user");
        let record = RecordBuilder.build(&submission, &Submitter::User(user), now);
        assert_eq!(record.user_id, "user-1");
        assert_eq!(record.date(), now.date_naive());
    }

    #[rstest]
    fn metadata_is_serialised_as_json(submission: Submission, now: DateTime<Utc>) {
        let record = RecordBuilder.build(&submission, &Submitter::Anonymous, now);
        let parsed: Value = serde_json::from_str(&record.metadata_json).expect("json");
        assert_eq!(parsed, json!({"temperature": 0.2}));
    }

    #[rstest]
    fn storage_record_exposes_partition_columns(submission: Submission, now: DateTime<Utc>) {
        let stored = RecordBuilder
            .build(&submission, &Submitter::Anonymous, now)
            .with_id(Uuid::nil());
        assert_eq!((stored.year(), stored.month(), stored.day()), (2025, 1, 2));
    }

    #[rstest]
    #[case("", "p", SubmissionValidationError::Empty { field: SubmissionField::ModelId })]
    #[case("m", "  ", SubmissionValidationError::Empty { field: SubmissionField::PromptId })]
    fn rejects_blank_identifiers(
        #[case] model_id: &str,
        #[case] prompt_id: &str,
        #[case] expected: SubmissionValidationError,
    ) {
        let draft = SubmissionDraft {
            model_id: model_id.into(),
            prompt_id: prompt_id.into(),
            output: "x".into(),
            metadata: Map::new(),
        };
        assert_eq!(Submission::try_from(draft), Err(expected));
    }

    #[rstest]
    fn rejects_overlong_model_id() {
        let draft = SubmissionDraft {
            model_id: "m".repeat(ID_MAX_CHARS + 1),
            prompt_id: "p".into(),
            ..SubmissionDraft::default()
        };
        let err = Submission::try_from(draft).expect_err("too long");
        assert_eq!(err.field(), SubmissionField::ModelId);
        assert_eq!(err.code(), "too_long");
    }

    #[rstest]
    fn rejects_oversized_output() {
        let draft = SubmissionDraft {
            model_id: "m".into(),
            prompt_id: "p".into(),
            output: "x".repeat(OUTPUT_MAX_BYTES + 1),
            metadata: Map::new(),
        };
        let err = Submission::try_from(draft).expect_err("too large");
        assert_eq!(err.field(), SubmissionField::Output);
    }

    #[rstest]
    fn accepts_empty_output() {
        let draft = SubmissionDraft {
            model_id: "m".into(),
            prompt_id: "p".into(),
            ..SubmissionDraft::default()
        };
        assert!(Submission::try_from(draft).is_ok());
    }
}
