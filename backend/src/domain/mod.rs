//! Domain types, services, and ports.
//!
//! Nothing here knows about HTTP. Services depend on the driven ports in
//! [`ports`] and implement the driving ports that inbound adapters call.

pub mod aggregation;
pub mod batch_writer;
pub mod columns;
pub mod data_rights;
pub mod error;
pub mod identity;
pub mod partition;
pub mod partition_scanner;
pub mod ports;
pub mod stats_service;
pub mod submission;
pub mod submission_service;
pub mod trace_id;
pub mod worker_pool;

use tracing::error;

pub use self::aggregation::{
    ChartReport, ChartRow, UserStats, UserStatsAccumulator, aggregate_chart,
};
pub use self::batch_writer::{BatchWriteError, BatchWriter};
pub use self::columns::RecordColumns;
pub use self::data_rights::DataRightsOperator;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::identity::{ANONYMOUS_USER, Submitter, UserId, UserIdValidationError};
pub use self::partition::{DateRange, DateRangeError, ObjectKey, PartitionKey, day_prefix};
pub use self::partition_scanner::{PartitionScanner, ScanOutput};
pub use self::stats_service::SubmissionStatsService;
pub use self::submission::{
    ContentHash, NewRecord, RecordBuilder, StorageRecord, Submission, SubmissionDraft,
    SubmissionField, SubmissionValidationError,
};
pub use self::submission_service::{MAX_BATCH_ITEMS, SubmissionService, validation_error};
pub use self::trace_id::TraceId;
pub use self::worker_pool::WorkerPool;

/// Map a storage failure that aborts an operation to `service_unavailable`.
pub(crate) fn storage_unavailable(err: ports::ObjectStorageError) -> Error {
    error!(error = %err, kind = err.kind(), "object storage request failed");
    Error::service_unavailable("object storage is unavailable")
}
