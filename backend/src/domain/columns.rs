//! Column-oriented view of decoded batch files.

use chrono::{DateTime, Utc};

use super::submission::StorageRecord;

/// Rows from one or more batch files, one vector per column.
///
/// All vectors always have the same length. Merging files appends each
/// column in turn, so row `i` of every column describes the same record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordColumns {
    pub ids: Vec<String>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub user_ids: Vec<String>,
    pub model_ids: Vec<String>,
    pub prompt_ids: Vec<String>,
    pub outputs: Vec<String>,
    pub output_hashes: Vec<String>,
    pub metadata_json: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<i32>,
    pub days: Vec<i32>,
}

impl RecordColumns {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn push(&mut self, record: &StorageRecord) {
        self.ids.push(record.id.to_string());
        self.timestamps.push(record.record.timestamp);
        self.user_ids.push(record.record.user_id.clone());
        self.model_ids.push(record.record.model_id.clone());
        self.prompt_ids.push(record.record.prompt_id.clone());
        self.outputs.push(record.record.output.clone());
        self.output_hashes.push(record.record.output_hash.to_string());
        self.metadata_json.push(record.record.metadata_json.clone());
        self.years.push(record.year());
        self.months.push(record.month());
        self.days.push(record.day());
    }

    /// Move every row of `other` onto the end of `self`.
    pub fn append(&mut self, mut other: RecordColumns) {
        self.ids.append(&mut other.ids);
        self.timestamps.append(&mut other.timestamps);
        self.user_ids.append(&mut other.user_ids);
        self.model_ids.append(&mut other.model_ids);
        self.prompt_ids.append(&mut other.prompt_ids);
        self.outputs.append(&mut other.outputs);
        self.output_hashes.append(&mut other.output_hashes);
        self.metadata_json.append(&mut other.metadata_json);
        self.years.append(&mut other.years);
        self.months.append(&mut other.months);
        self.days.append(&mut other.days);
    }
}

impl<'a> FromIterator<&'a StorageRecord> for RecordColumns {
    fn from_iter<I: IntoIterator<Item = &'a StorageRecord>>(iter: I) -> Self {
        let mut columns = Self::default();
        for record in iter {
            columns.push(record);
        }
        columns
    }
}
