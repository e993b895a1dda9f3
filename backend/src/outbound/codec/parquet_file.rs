//! Parquet batch files via `arrow` record batches.
//!
//! Files are written with ZSTD level 9: outputs are highly repetitive text
//! and files are read far more often than written.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array, StringArray, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, Datelike, Utc};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::domain::ports::{BatchCodec, BatchCodecError};
use crate::domain::{RecordColumns, StorageRecord};

const ZSTD_LEVEL: i32 = 9;

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, None)
}

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("timestamp", timestamp_type(), false),
        Field::new("user_id", DataType::Utf8, false),
        Field::new("model_id", DataType::Utf8, false),
        Field::new("prompt_id", DataType::Utf8, false),
        Field::new("output", DataType::Utf8, false),
        Field::new("output_hash", DataType::Utf8, false),
        Field::new("metadata_json", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
    ]))
}

fn strings<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetBatchCodec;

impl ParquetBatchCodec {
    fn record_batch(records: &[StorageRecord]) -> Result<RecordBatch, BatchCodecError> {
        let ids: Vec<String> = records.iter().map(|r| r.id.to_string()).collect();
        let hashes: Vec<String> = records
            .iter()
            .map(|r| r.record.output_hash.to_string())
            .collect();
        let columns: Vec<ArrayRef> = vec![
            strings(ids.iter().map(String::as_str)),
            Arc::new(TimestampMicrosecondArray::from_iter_values(
                records.iter().map(|r| r.record.timestamp.timestamp_micros()),
            )),
            strings(records.iter().map(|r| r.record.user_id.as_str())),
            strings(records.iter().map(|r| r.record.model_id.as_str())),
            strings(records.iter().map(|r| r.record.prompt_id.as_str())),
            strings(records.iter().map(|r| r.record.output.as_str())),
            strings(hashes.iter().map(String::as_str)),
            strings(records.iter().map(|r| r.record.metadata_json.as_str())),
            Arc::new(Int32Array::from_iter_values(records.iter().map(StorageRecord::year))),
            Arc::new(Int32Array::from_iter_values(records.iter().map(StorageRecord::month))),
            Arc::new(Int32Array::from_iter_values(records.iter().map(StorageRecord::day))),
        ];
        RecordBatch::try_new(schema(), columns)
            .map_err(|err| BatchCodecError::encode(format!("arrow error: {err}")))
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, BatchCodecError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| BatchCodecError::decode(format!("missing column {name}")))
}

/// Read a text column, accepting any type arrow can cast to UTF-8.
fn read_strings(batch: &RecordBatch, name: &str) -> Result<Vec<String>, BatchCodecError> {
    let casted = cast(column(batch, name)?, &DataType::Utf8)
        .map_err(|err| BatchCodecError::decode(format!("column {name}: {err}")))?;
    let array = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| BatchCodecError::decode(format!("column {name} is not text")))?;
    Ok(array
        .iter()
        .map(|value| value.unwrap_or_default().to_owned())
        .collect())
}

fn read_timestamps(batch: &RecordBatch) -> Result<Vec<DateTime<Utc>>, BatchCodecError> {
    let casted = cast(column(batch, "timestamp")?, &timestamp_type())
        .map_err(|err| BatchCodecError::decode(format!("column timestamp: {err}")))?;
    let array = casted
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| BatchCodecError::decode("column timestamp is not a timestamp"))?;
    array
        .iter()
        .map(|value| {
            value
                .and_then(DateTime::from_timestamp_micros)
                .ok_or_else(|| BatchCodecError::decode("timestamp out of range or null"))
        })
        .collect()
}

/// Read a partition column, deriving it from the timestamps when absent.
fn read_partition(
    batch: &RecordBatch,
    name: &str,
    timestamps: &[DateTime<Utc>],
    derive: fn(&DateTime<Utc>) -> i32,
) -> Result<Vec<i32>, BatchCodecError> {
    let Some(raw) = batch.column_by_name(name) else {
        return Ok(timestamps.iter().map(derive).collect());
    };
    let casted = cast(raw, &DataType::Int32)
        .map_err(|err| BatchCodecError::decode(format!("column {name}: {err}")))?;
    let array = casted
        .as_any()
        .downcast_ref::<Int32Array>()
        .ok_or_else(|| BatchCodecError::decode(format!("column {name} is not an integer")))?;
    Ok(array
        .iter()
        .zip(timestamps)
        .map(|(value, ts)| value.unwrap_or_else(|| derive(ts)))
        .collect())
}

fn decode_batch(batch: &RecordBatch) -> Result<RecordColumns, BatchCodecError> {
    let timestamps = read_timestamps(batch)?;
    Ok(RecordColumns {
        ids: read_strings(batch, "id")?,
        user_ids: read_strings(batch, "user_id")?,
        model_ids: read_strings(batch, "model_id")?,
        prompt_ids: read_strings(batch, "prompt_id")?,
        outputs: read_strings(batch, "output")?,
        output_hashes: read_strings(batch, "output_hash")?,
        metadata_json: read_strings(batch, "metadata_json")?,
        years: read_partition(batch, "year", &timestamps, |ts| ts.year())?,
        months: read_partition(batch, "month", &timestamps, |ts| ts.month() as i32)?,
        days: read_partition(batch, "day", &timestamps, |ts| ts.day() as i32)?,
        timestamps,
    })
}

impl BatchCodec for ParquetBatchCodec {
    fn file_extension(&self) -> &'static str {
        "parquet"
    }

    fn encode(&self, records: &[StorageRecord]) -> Result<Vec<u8>, BatchCodecError> {
        let batch = Self::record_batch(records)?;
        let level = ZstdLevel::try_new(ZSTD_LEVEL)
            .map_err(|err| BatchCodecError::encode(format!("zstd level: {err}")))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))
            .map_err(|err| BatchCodecError::encode(format!("parquet writer: {err}")))?;
        writer
            .write(&batch)
            .map_err(|err| BatchCodecError::encode(format!("parquet write: {err}")))?;
        writer
            .close()
            .map_err(|err| BatchCodecError::encode(format!("parquet close: {err}")))?;
        Ok(buf)
    }

    fn decode(&self, bytes: Bytes) -> Result<RecordColumns, BatchCodecError> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .and_then(|builder| builder.build())
            .map_err(|err| BatchCodecError::decode(format!("parquet reader: {err}")))?;

        let mut columns = RecordColumns::default();
        for batch in reader {
            let batch =
                batch.map_err(|err| BatchCodecError::decode(format!("parquet read: {err}")))?;
            columns.append(decode_batch(&batch)?);
        }
        Ok(columns)
    }
}
