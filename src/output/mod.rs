//! Output module
//!
//! Handles Arrow RecordBatch creation and local file output.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Inferring Arrow schemas from JSON records
//! - Converting JSON to Arrow RecordBatches, with timestamp coercion
//! - Writing and reading Parquet and CSV files
//! - The timestamped, never-overwriting [`FileSink`]

mod schema;
mod sink;
mod writer;

pub use schema::{
    coerce_timestamps, conform_batch, infer_schema, json_to_arrow, merge_schemas, merge_types,
    parse_timestamp, timestamp_type, unify_batches,
};
pub(crate) use sink::validate_prefix;
pub use sink::{combined_file_name, list_sink_files, FileSink, SinkFileName};
pub use writer::{
    csv_to_arrow, encode_csv, encode_parquet, read_batch, write_batch, ParquetWriter, ParquetWriterConfig,
};

#[cfg(test)]
mod tests;
