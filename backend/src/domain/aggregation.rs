//! Order-independent reductions over scanned records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use super::columns::RecordColumns;
use super::identity::UserId;

/// Submission counts per model for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRow {
    pub date: NaiveDate,
    pub counts: BTreeMap<String, u64>,
}

/// Daily per-model submission counts over a date range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartReport {
    /// One row per date with at least one counted submission, ascending.
    pub rows: Vec<ChartRow>,
    /// Every model seen in range, before filtering, sorted.
    pub models: Vec<String>,
    /// Rows seen in range, before filtering.
    pub total_submissions: u64,
    /// The underlying listing hit its cap.
    pub truncated: bool,
}

/// Group rows by `(date of timestamp, model_id)`.
///
/// Models outside `allow` are left out of the per-day counts but still
/// appear in [`ChartReport::models`] and the total.
///
/// # Examples
/// ```
/// use pramana::domain::{RecordColumns, aggregate_chart};
///
/// let report = aggregate_chart(&RecordColumns::default(), None);
/// assert!(report.rows.is_empty());
/// assert_eq!(report.total_submissions, 0);
/// ```
pub fn aggregate_chart(columns: &RecordColumns, allow: Option<&BTreeSet<String>>) -> ChartReport {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, u64>> = BTreeMap::new();
    let mut models = BTreeSet::new();

    for (timestamp, model) in columns.timestamps.iter().zip(&columns.model_ids) {
        models.insert(model.clone());
        if allow.is_some_and(|allowed| !allowed.contains(model)) {
            continue;
        }
        *by_date
            .entry(timestamp.date_naive())
            .or_default()
            .entry(model.clone())
            .or_insert(0) += 1;
    }

    ChartReport {
        rows: by_date
            .into_iter()
            .map(|(date, counts)| ChartRow { date, counts })
            .collect(),
        models: models.into_iter().collect(),
        total_submissions: columns.len() as u64,
        truncated: false,
    }
}

/// Lifetime submission summary for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: UserId,
    pub total_submissions: u64,
    pub models: Vec<String>,
    pub last_submission: Option<DateTime<Utc>>,
    pub truncated: bool,
}

impl UserStats {
    pub fn models_count(&self) -> usize {
        self.models.len()
    }
}

/// Running totals folded over every file a user owns.
#[derive(Debug, Clone, Default)]
pub struct UserStatsAccumulator {
    total: u64,
    models: BTreeSet<String>,
    last: Option<DateTime<Utc>>,
}

impl UserStatsAccumulator {
    pub fn absorb(&mut self, columns: &RecordColumns) {
        self.total += columns.len() as u64;
        self.models.extend(columns.model_ids.iter().cloned());
        for timestamp in &columns.timestamps {
            if self.last.is_none_or(|last| *timestamp > last) {
                self.last = Some(*timestamp);
            }
        }
    }

    pub fn finish(self, user_id: UserId, truncated: bool) -> UserStats {
        UserStats {
            user_id,
            total_submissions: self.total,
            models: self.models.into_iter().collect(),
            last_submission: self.last,
            truncated,
        }
    }
}
