//! Hive-style partition layout of batch files.
//!
//! Every batch file lives at
//! `year=<Y>/month=<MM>/day=<DD>/user=<U>/<file>`. Date-range scans list one
//! day prefix at a time; user-scoped operations parse each key and compare
//! the `user` segment exactly.

use chrono::{Datelike, Days, NaiveDate};

/// Listing prefix covering every user's files for one calendar day.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use pramana::domain::day_prefix;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date");
/// assert_eq!(day_prefix(date), "year=2025/month=01/day=02/");
/// ```
pub fn day_prefix(date: NaiveDate) -> String {
    format!(
        "year={}/month={:02}/day={:02}/",
        date.year(),
        date.month(),
        date.day()
    )
}

/// The `(date, user)` pair a batch file is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    date: NaiveDate,
    user: String,
}

impl PartitionKey {
    pub fn new(date: NaiveDate, user: impl Into<String>) -> Self {
        Self {
            date,
            user: user.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Full object key for `file_name` inside this partition.
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}user={}/{}", day_prefix(self.date), self.user, file_name)
    }
}

/// A batch-file key split into its partition fields.
///
/// # Examples
/// ```
/// use pramana::domain::ObjectKey;
///
/// let key = ObjectKey::parse("year=2025/month=01/day=02/user=alice/b.parquet")
///     .expect("well-formed key");
/// assert!(key.belongs_to("alice"));
/// assert!(!key.belongs_to("ali"));
/// assert_eq!(
///     key.with_user("anonymous").as_key(),
///     "year=2025/month=01/day=02/user=anonymous/b.parquet"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    partition: PartitionKey,
    file_name: String,
}

fn segment<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.strip_prefix(name)?.strip_prefix('=')
}

impl ObjectKey {
    /// Parse a key; returns `None` for anything outside the partition layout.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('/');
        let year: i32 = segment(parts.next()?, "year")?.parse().ok()?;
        let month: u32 = segment(parts.next()?, "month")?.parse().ok()?;
        let day: u32 = segment(parts.next()?, "day")?.parse().ok()?;
        let user = segment(parts.next()?, "user")?;
        let file_name = parts.next()?;
        if parts.next().is_some() || user.is_empty() || file_name.is_empty() {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self {
            partition: PartitionKey::new(date, user),
            file_name: file_name.to_owned(),
        })
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// True when the key's user segment equals `user` exactly.
    pub fn belongs_to(&self, user: &str) -> bool {
        self.partition.user == user
    }

    /// Same file placed under another user's partition.
    pub fn with_user(&self, user: &str) -> Self {
        Self {
            partition: PartitionKey::new(self.partition.date, user),
            file_name: self.file_name.clone(),
        }
    }

    pub fn as_key(&self) -> String {
        self.partition.object_key(&self.file_name)
    }
}

/// Reasons a [`DateRange`] cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("date range spans more than {max_days} days")]
    TooLong { max_days: u32 },
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range covering at most `max_days` calendar days.
    pub fn new(start: NaiveDate, end: NaiveDate, max_days: u32) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        let span = (end - start).num_days() + 1;
        if span > i64::from(max_days) {
            return Err(DateRangeError::TooLong { max_days });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every date from `start` to `end`, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        std::iter::successors(Some(self.start), |day| day.checked_add_days(Days::new(1)))
            .take_while(move |day| *day <= end)
    }
}
