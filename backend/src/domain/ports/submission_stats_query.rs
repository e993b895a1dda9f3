//! Driving port for read-side statistics over stored submissions.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{ChartReport, DateRange, Error, UserId, UserStats};

/// Chart over `range`, optionally limited to `models`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub range: DateRange,
    pub models: Option<BTreeSet<String>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionStatsQuery: Send + Sync {
    async fn chart(&self, request: ChartRequest) -> Result<ChartReport, Error>;

    async fn user_stats(&self, user: &UserId) -> Result<UserStats, Error>;
}

/// Query over an empty store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSubmissionStatsQuery;

#[async_trait]
impl SubmissionStatsQuery for FixtureSubmissionStatsQuery {
    async fn chart(&self, _request: ChartRequest) -> Result<ChartReport, Error> {
        Ok(ChartReport::default())
    }

    async fn user_stats(&self, user: &UserId) -> Result<UserStats, Error> {
        Ok(UserStats {
            user_id: user.clone(),
            total_submissions: 0,
            models: Vec::new(),
            last_submission: None,
            truncated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_reports_no_submissions() {
        let user = UserId::new("u").expect("valid user");
        let stats = FixtureSubmissionStatsQuery
            .user_stats(&user)
            .await
            .expect("fixture succeeds");
        assert_eq!(stats.total_submissions, 0);
        assert_eq!(stats.user_id, user);
    }
}
