//! Behavioural tests for erasure and anonymisation over real batch files.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use pramana::domain::ports::{
    BatchCodec, ChartRequest, DataRightsCommand, DataRightsOutcome, ObjectStorage,
    SubmissionCommand, SubmissionStatsQuery, SubmitRequest,
};
use pramana::domain::{
    ANONYMOUS_USER, BatchWriter, DataRightsOperator, DateRange, ObjectKey, PartitionScanner,
    SubmissionDraft, SubmissionService, SubmissionStatsService, Submitter, UserId, WorkerPool,
    day_prefix,
};
use pramana::outbound::codec::ParquetBatchCodec;
use pramana::outbound::storage::ObjectStoreStorage;
use pramana::test_support::FixedClock;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Map;
use tokio::runtime::Runtime;

struct DataRightsWorld {
    runtime: Runtime,
    now: DateTime<Utc>,
    storage: Arc<ObjectStoreStorage>,
    submissions: SubmissionService,
    stats: SubmissionStatsService,
    operator: DataRightsOperator,
    last_outcome: Option<DataRightsOutcome>,
    /// Object bytes held by each user's partition just before anonymisation.
    before_anonymising: BTreeMap<String, Bytes>,
}

fn setup_world() -> DataRightsWorld {
    let runtime = Runtime::new().expect("tokio runtime should initialize");
    let now = Utc
        .with_ymd_and_hms(2025, 7, 4, 16, 30, 0)
        .single()
        .expect("valid instant");
    let storage = Arc::new(ObjectStoreStorage::in_memory());
    let shared: Arc<dyn ObjectStorage> = storage.clone();
    let codec: Arc<dyn BatchCodec> = Arc::new(ParquetBatchCodec);
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
    let scanner = PartitionScanner::new(
        Arc::clone(&shared),
        Arc::clone(&codec),
        WorkerPool::new(4),
        1_000,
    );
    let writer = BatchWriter::new(shared, codec, Arc::clone(&clock));

    DataRightsWorld {
        runtime,
        now,
        storage,
        submissions: SubmissionService::new(writer, clock),
        stats: SubmissionStatsService::new(scanner.clone(), 1_000),
        operator: DataRightsOperator::new(scanner, 1_000),
        last_outcome: None,
        before_anonymising: BTreeMap::new(),
    }
}

#[fixture]
fn world() -> Mutex<DataRightsWorld> {
    Mutex::new(setup_world())
}

fn user(name: &str) -> UserId {
    UserId::new(name).expect("valid user id")
}

#[given("a bucket holding 2 batch files for alice and 1 for bob")]
fn a_bucket_with_files(world: &Mutex<DataRightsWorld>) {
    let world = world.lock().expect("world lock");
    world.runtime.block_on(async {
        for (name, model) in [("alice", "gpt"), ("alice", "claude"), ("bob", "gpt")] {
            world
                .submissions
                .submit(SubmitRequest {
                    submitter: Submitter::User(user(name)),
                    draft: SubmissionDraft {
                        model_id: model.into(),
                        prompt_id: "safety-12".into(),
                        output: format!("{name} ran {model}"),
                        metadata: Map::new(),
                    },
                })
                .await
                .expect("submission stored");
        }
    });
}

fn objects_owned_by(world: &DataRightsWorld, name: &str) -> BTreeMap<String, Bytes> {
    world.runtime.block_on(async {
        let listing = world.storage.list("", 1_000).await.expect("listing succeeds");
        let mut owned = BTreeMap::new();
        for key in listing.keys {
            if ObjectKey::parse(&key).is_some_and(|parsed| parsed.belongs_to(name)) {
                let bytes = world.storage.get(&key).await.expect("object readable");
                owned.insert(key, bytes);
            }
        }
        owned
    })
}

#[given("a legacy object stored for {name}")]
fn a_legacy_object(world: &Mutex<DataRightsWorld>, name: String) {
    let world = world.lock().expect("world lock");
    let key = format!("{}user={name}/legacy.json", day_prefix(world.now.date_naive()));
    world
        .runtime
        .block_on(world.storage.put(&key, Bytes::from_static(b"{\"legacy\": true}")))
        .expect("legacy object stored");
}

#[when("{name} requests erasure")]
fn requests_erasure(world: &Mutex<DataRightsWorld>, name: String) {
    let mut world = world.lock().expect("world lock");
    let outcome = world
        .runtime
        .block_on(world.operator.erase(&user(&name)))
        .expect("erasure completes");
    world.last_outcome = Some(outcome);
}

#[when("{name} requests anonymisation")]
fn requests_anonymisation(world: &Mutex<DataRightsWorld>, name: String) {
    let mut world = world.lock().expect("world lock");
    world.before_anonymising = objects_owned_by(&world, &name);
    let outcome = world
        .runtime
        .block_on(world.operator.anonymize(&user(&name)))
        .expect("anonymisation completes");
    world.last_outcome = Some(outcome);
}

#[then("{count} files are reported as {status}")]
fn files_are_reported(world: &Mutex<DataRightsWorld>, count: usize, status: String) {
    let world = world.lock().expect("world lock");
    let outcome = world.last_outcome.expect("an outcome was recorded");
    assert_eq!(outcome.action.as_str(), status);
    assert_eq!(outcome.files_affected, count);
    assert_eq!(outcome.files_failed, 0);
    assert!(!outcome.truncated);
}

#[then("the partition for {name} holds {count} files")]
fn partition_holds(world: &Mutex<DataRightsWorld>, name: String, count: usize) {
    let world = world.lock().expect("world lock");
    let listing = world
        .runtime
        .block_on(world.storage.list("", 1_000))
        .expect("listing succeeds");
    let owned = listing
        .keys
        .iter()
        .filter(|key| ObjectKey::parse(key).is_some_and(|parsed| parsed.belongs_to(&name)))
        .count();
    assert_eq!(owned, count, "files under user={name}");
}

#[then("every file moved for {name} keeps its original bytes")]
fn moved_files_keep_bytes(world: &Mutex<DataRightsWorld>, name: String) {
    let world = world.lock().expect("world lock");
    assert!(!world.before_anonymising.is_empty(), "{name} had files to move");
    assert!(objects_owned_by(&world, &name).is_empty());
    for (key, original) in &world.before_anonymising {
        let moved = ObjectKey::parse(key)
            .expect("well-formed key")
            .with_user(ANONYMOUS_USER)
            .as_key();
        let bytes = world
            .runtime
            .block_on(world.storage.get(&moved))
            .expect("moved object readable");
        assert_eq!(&bytes, original, "bytes of {moved}");
    }
}

#[then("the crowd chart counts {count} submissions")]
fn crowd_chart_counts(world: &Mutex<DataRightsWorld>, count: u64) {
    let world = world.lock().expect("world lock");
    let day = world.now.date_naive();
    let report = world
        .runtime
        .block_on(world.stats.chart(ChartRequest {
            range: DateRange::new(day, day, 366).expect("valid range"),
            models: None,
        }))
        .expect("chart computed");
    assert_eq!(report.total_submissions, count);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Erasure deletes only the requesting user's files"
)]
fn erasure_deletes_only_the_requesting_users_files(world: Mutex<DataRightsWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Anonymisation moves files into the anonymous partition"
)]
fn anonymisation_moves_files_into_the_anonymous_partition(world: Mutex<DataRightsWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Erasure with nothing stored is a no-op"
)]
fn erasure_with_nothing_stored_is_a_no_op(world: Mutex<DataRightsWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Erasing twice finds nothing the second time"
)]
fn erasing_twice_finds_nothing_the_second_time(world: Mutex<DataRightsWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Anonymisation keeps each file's bytes"
)]
fn anonymisation_keeps_each_files_bytes(world: Mutex<DataRightsWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Erasure removes objects that are not batch files"
)]
fn erasure_removes_objects_that_are_not_batch_files(world: Mutex<DataRightsWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/data_rights.feature",
    name = "Anonymisation moves objects that are not batch files"
)]
fn anonymisation_moves_objects_that_are_not_batch_files(world: Mutex<DataRightsWorld>) {
    drop(world);
}
