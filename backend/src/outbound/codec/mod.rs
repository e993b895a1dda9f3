//! Batch file codecs.

mod parquet_file;

pub use self::parquet_file::ParquetBatchCodec;
