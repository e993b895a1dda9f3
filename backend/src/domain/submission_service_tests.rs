//! Tests for the submission service.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::{Map, json};

use super::*;
use crate::domain::ports::{
    BatchCodecError, MockBatchCodec, MockObjectStorage, ObjectStorageError,
};
use crate::domain::{ErrorCode, StorageRecord, SubmissionDraft, Submitter, UserId};
use crate::test_support::FixedClock;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

type Captured = Arc<Mutex<Vec<Vec<StorageRecord>>>>;

/// Service whose codec records every encoded batch and whose storage
/// accepts every upload.
fn service(
    now: DateTime<Utc>,
    puts: usize,
) -> (SubmissionService, Captured, Arc<Mutex<Vec<String>>>) {
    let encoded: Captured = Arc::default();
    let keys: Arc<Mutex<Vec<String>>> = Arc::default();

    let mut codec = MockBatchCodec::new();
    codec.expect_file_extension().return_const("parquet");
    let sink = Arc::clone(&encoded);
    codec.expect_encode().returning(move |records| {
        sink.lock().expect("lock").push(records.to_vec());
        Ok(vec![0])
    });

    let mut storage = MockObjectStorage::new();
    let key_sink = Arc::clone(&keys);
    storage.expect_put().times(puts).returning(move |key, _| {
        key_sink.lock().expect("lock").push(key.to_owned());
        Ok(())
    });

    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    let writer = BatchWriter::new(Arc::new(storage), Arc::new(codec), Arc::clone(&clock));
    (SubmissionService::new(writer, clock), encoded, keys)
}

fn draft(model: &str) -> SubmissionDraft {
    SubmissionDraft {
        model_id: model.into(),
        prompt_id: "prompt-1".into(),
        output: "answer".into(),
        metadata: Map::new(),
    }
}

#[rstest]
#[tokio::test]
async fn submit_returns_accepted_receipt(now: DateTime<Utc>) {
    let (service, encoded, keys) = service(now, 1);
    let receipt = service
        .submit(SubmitRequest {
            submitter: Submitter::Anonymous,
            draft: draft("gpt-4o"),
        })
        .await
        .expect("submission accepted");

    assert_eq!(receipt.status, SubmissionStatus::Accepted);
    assert_eq!(
        receipt.hash,
        crate::domain::ContentHash::compute("gpt-4o", "prompt-1", "answer")
    );
    let batches = encoded.lock().expect("lock");
    assert_eq!(batches[0][0].id, receipt.id);
    assert!(keys.lock().expect("lock")[0].contains("/user=anonymous/"));
}

#[rstest]
#[tokio::test]
async fn submit_rejects_invalid_draft_without_writing(now: DateTime<Utc>) {
    let (service, _, _) = service(now, 0);
    let err = service
        .submit(SubmitRequest {
            submitter: Submitter::Anonymous,
            draft: draft("  "),
        })
        .await
        .expect_err("blank model rejected");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.details(), Some(&json!({"field": "model_id", "code": "empty"})));
}

#[rstest]
#[tokio::test]
async fn batch_writes_one_file_for_all_valid_items(now: DateTime<Utc>) {
    let (service, encoded, keys) = service(now, 1);
    let user = UserId::new("alice").expect("valid user");
    let receipt = service
        .submit_batch(SubmitBatchRequest {
            submitter: Submitter::User(user),
            context: Map::new(),
            items: vec![draft("a"), draft("b"), draft("c")],
        })
        .await
        .expect("batch accepted");

    assert_eq!(receipt.status, BatchStatus::Completed);
    assert_eq!(receipt.submitted, 3);
    assert_eq!(encoded.lock().expect("lock")[0].len(), 3);
    assert!(keys.lock().expect("lock")[0].contains("/user=alice/"));
}

#[rstest]
#[tokio::test]
async fn batch_isolates_invalid_items(now: DateTime<Utc>) {
    let (service, encoded, _) = service(now, 1);
    let receipt = service
        .submit_batch(SubmitBatchRequest {
            submitter: Submitter::Anonymous,
            context: Map::new(),
            items: vec![draft("a"), draft(""), draft("c")],
        })
        .await
        .expect("batch processed");

    assert_eq!(receipt.status, BatchStatus::Partial);
    assert_eq!(receipt.submitted, 2);
    let indices: Vec<_> = receipt.results.iter().map(BatchItemOutcome::index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(matches!(receipt.results[1], BatchItemOutcome::Rejected { .. }));
    assert_eq!(encoded.lock().expect("lock")[0].len(), 2);
}

#[rstest]
#[tokio::test]
async fn batch_of_only_invalid_items_writes_nothing(now: DateTime<Utc>) {
    let (service, encoded, _) = service(now, 0);
    let receipt = service
        .submit_batch(SubmitBatchRequest {
            submitter: Submitter::Anonymous,
            context: Map::new(),
            items: vec![draft("")],
        })
        .await
        .expect("batch processed");

    assert_eq!(receipt.status, BatchStatus::Partial);
    assert_eq!(receipt.submitted, 0);
    assert!(encoded.lock().expect("lock").is_empty());
}

#[rstest]
#[tokio::test]
async fn batch_context_fills_missing_metadata(now: DateTime<Utc>) {
    let (service, encoded, _) = service(now, 1);
    let mut item = draft("a");
    item.metadata.insert("seed".into(), json!(7));
    let mut context = Map::new();
    context.insert("seed".into(), json!(42));
    context.insert("suite_version".into(), json!("1.0"));

    service
        .submit_batch(SubmitBatchRequest {
            submitter: Submitter::Anonymous,
            context,
            items: vec![item],
        })
        .await
        .expect("batch accepted");

    let batches = encoded.lock().expect("lock");
    let metadata: serde_json::Value =
        serde_json::from_str(&batches[0][0].record.metadata_json).expect("json");
    assert_eq!(metadata, json!({"seed": 7, "suite_version": "1.0"}));
}

#[rstest]
#[case(0)]
#[case(MAX_BATCH_ITEMS + 1)]
#[tokio::test]
async fn batch_size_is_bounded(now: DateTime<Utc>, #[case] count: usize) {
    let (service, _, _) = service(now, 0);
    let err = service
        .submit_batch(SubmitBatchRequest {
            submitter: Submitter::Anonymous,
            context: Map::new(),
            items: vec![draft("a"); count],
        })
        .await
        .expect_err("size rejected");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn storage_failure_is_service_unavailable(now: DateTime<Utc>) {
    let mut codec = MockBatchCodec::new();
    codec.expect_file_extension().return_const("parquet");
    codec.expect_encode().returning(|_| Ok(vec![0]));
    let mut storage = MockObjectStorage::new();
    storage
        .expect_put()
        .returning(|key, _: Bytes| Err(ObjectStorageError::write(key, "timeout")));
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    let service = SubmissionService::new(
        BatchWriter::new(Arc::new(storage), Arc::new(codec), Arc::clone(&clock)),
        clock,
    );

    let err = service
        .submit(SubmitRequest {
            submitter: Submitter::Anonymous,
            draft: draft("a"),
        })
        .await
        .expect_err("write fails");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn encode_failure_is_internal(now: DateTime<Utc>) {
    let mut codec = MockBatchCodec::new();
    codec.expect_file_extension().return_const("parquet");
    codec
        .expect_encode()
        .returning(|_| Err(BatchCodecError::encode("bad schema")));
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    let service = SubmissionService::new(
        BatchWriter::new(
            Arc::new(MockObjectStorage::new()),
            Arc::new(codec),
            Arc::clone(&clock),
        ),
        clock,
    );

    let err = service
        .submit(SubmitRequest {
            submitter: Submitter::Anonymous,
            draft: draft("a"),
        })
        .await
        .expect_err("encode fails");
    assert_eq!(err.code(), ErrorCode::InternalError);
}
