//! Chart and per-user statistics computed by scanning batch files.

use async_trait::async_trait;
use tracing::debug;

use super::aggregation::{ChartReport, UserStats, UserStatsAccumulator, aggregate_chart};
use super::partition_scanner::PartitionScanner;
use super::ports::{ChartRequest, SubmissionStatsQuery};
use super::{Error, UserId, storage_unavailable};

/// Implements [`SubmissionStatsQuery`] over a [`PartitionScanner`].
#[derive(Clone)]
pub struct SubmissionStatsService {
    scanner: PartitionScanner,
    user_scan_cap: usize,
}

impl SubmissionStatsService {
    /// `user_scan_cap` bounds the keys listed when looking up one user.
    pub fn new(scanner: PartitionScanner, user_scan_cap: usize) -> Self {
        Self {
            scanner,
            user_scan_cap,
        }
    }
}

#[async_trait]
impl SubmissionStatsQuery for SubmissionStatsService {
    async fn chart(&self, request: ChartRequest) -> Result<ChartReport, Error> {
        let scan = self
            .scanner
            .scan_range(&request.range)
            .await
            .map_err(storage_unavailable)?;
        let mut report = aggregate_chart(&scan.columns, request.models.as_ref());
        report.truncated = scan.truncated;
        debug!(
            start = %request.range.start(),
            end = %request.range.end(),
            files = scan.files_read,
            rows = report.total_submissions,
            "chart computed"
        );
        Ok(report)
    }

    async fn user_stats(&self, user: &UserId) -> Result<UserStats, Error> {
        let listing = self
            .scanner
            .list_user_keys(user.as_ref(), self.user_scan_cap)
            .await
            .map_err(storage_unavailable)?;
        let scan = self.scanner.fetch(listing.keys).await;

        let mut acc = UserStatsAccumulator::default();
        acc.absorb(&scan.columns);
        Ok(acc.finish(user.clone(), listing.truncated))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use bytes::Bytes;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{
        KeyListing, MockBatchCodec, MockObjectStorage, ObjectStorageError,
    };
    use crate::domain::{DateRange, ErrorCode, RecordColumns, WorkerPool};

    /// Each file body is `"<day>:<model>"`; decoding yields one row.
    fn codec() -> MockBatchCodec {
        let mut codec = MockBatchCodec::new();
        codec.expect_file_extension().return_const("parquet");
        codec.expect_decode().returning(|bytes: Bytes| {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let (day, model) = text.split_once(':').unwrap_or(("1", text.as_str()));
            let day: u32 = day.parse().unwrap_or(1);
            let mut columns = RecordColumns::default();
            columns.ids.push(text.clone());
            columns.model_ids.push(model.to_owned());
            columns.timestamps.push(
                Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0)
                    .single()
                    .expect("valid instant"),
            );
            Ok(columns)
        });
        codec
    }

    fn service(storage: MockObjectStorage) -> SubmissionStatsService {
        let scanner =
            PartitionScanner::new(Arc::new(storage), Arc::new(codec()), WorkerPool::new(2), 50);
        SubmissionStatsService::new(scanner, 500)
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date"),
            366,
        )
        .expect("valid range")
    }

    #[rstest]
    #[tokio::test]
    async fn chart_counts_scanned_rows() {
        let mut storage = MockObjectStorage::new();
        storage.expect_list().returning(|prefix, _| {
            let keys = if prefix.ends_with("day=01/") {
                vec![format!("{prefix}user=a/1.parquet"), format!("{prefix}user=b/2.parquet")]
            } else {
                vec![format!("{prefix}user=a/3.parquet")]
            };
            Ok(KeyListing {
                keys,
                truncated: false,
            })
        });
        storage.expect_get().returning(|key| {
            let body = match key.rsplit('/').next() {
                Some("1.parquet") | Some("2.parquet") => "1:A",
                _ => "2:B",
            };
            Ok(Bytes::from(body))
        });

        let report = service(storage)
            .chart(ChartRequest {
                range: range(),
                models: Some(BTreeSet::from(["B".to_owned()])),
            })
            .await
            .expect("chart succeeds");

        assert_eq!(report.total_submissions, 3);
        assert_eq!(report.models, vec!["A", "B"]);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].counts.get("B"), Some(&1));
    }

    #[rstest]
    #[tokio::test]
    async fn chart_listing_failure_is_unavailable() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_list()
            .returning(|prefix, _| Err(ObjectStorageError::list(prefix, "refused")));

        let err = service(storage)
            .chart(ChartRequest {
                range: range(),
                models: None,
            })
            .await
            .expect_err("listing fails");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn user_stats_only_read_the_users_files() {
        let mut storage = MockObjectStorage::new();
        storage.expect_list().returning(|_, _| {
            Ok(KeyListing {
                keys: vec![
                    "year=2025/month=01/day=01/user=carol/a.parquet".into(),
                    "year=2025/month=01/day=02/user=carol/b.parquet".into(),
                    "year=2025/month=01/day=02/user=dave/c.parquet".into(),
                ],
                truncated: true,
            })
        });
        storage.expect_get().times(2).returning(|key| {
            let body = if key.ends_with("a.parquet") { "1:A" } else { "2:B" };
            Ok(Bytes::from(body))
        });

        let user = UserId::new("carol").expect("valid user");
        let stats = service(storage).user_stats(&user).await.expect("stats succeed");

        assert_eq!(stats.total_submissions, 2);
        assert_eq!(stats.models, vec!["A", "B"]);
        assert_eq!(
            stats.last_submission,
            Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).single()
        );
        assert!(stats.truncated);
    }
}
