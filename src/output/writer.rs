//! Parquet and CSV file writers and readers

use super::schema::json_to_arrow;
use crate::decode::{CsvDecoder, RecordDecoder};
use crate::error::{Error, Result};
use crate::types::FileFormat;
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet writer over any sink (file or in-memory buffer)
pub struct ParquetWriter<W: Write + Send> {
    writer: ArrowWriter<W>,
    rows_written: usize,
}

impl<W: Write + Send> ParquetWriter<W> {
    /// Create a new Parquet writer
    pub fn new(sink: W, schema: &Schema, config: &ParquetWriterConfig) -> Result<Self> {
        let props = config.build_properties();
        let writer = ArrowWriter::try_new(sink, Arc::new(schema.clone()), Some(props))
            .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer
            .write(batch)
            .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Get the number of rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Finish the file and hand back the underlying sink
    pub fn finish(self) -> Result<(W, usize)> {
        let rows = self.rows_written;
        let sink = self
            .writer
            .into_inner()
            .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
        Ok((sink, rows))
    }
}

/// Encode a batch as an in-memory Parquet file
pub fn encode_parquet(batch: &RecordBatch, config: &ParquetWriterConfig) -> Result<Bytes> {
    let mut writer = ParquetWriter::new(Vec::new(), batch.schema().as_ref(), config)?;
    writer.write(batch)?;
    let (buf, _) = writer.finish()?;
    Ok(Bytes::from(buf))
}

/// Encode a batch as CSV with a header row
pub fn encode_csv(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(&mut buf);
        writer.write(batch)?;
    }
    Ok(buf)
}

/// Write a single RecordBatch to `path` in the given format
///
/// The file is flushed and synced before returning.
pub fn write_batch(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    format: FileFormat,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create {}: {e}", path.display())))?;

    let file = match format {
        FileFormat::Parquet => {
            let mut writer = ParquetWriter::new(file, batch.schema().as_ref(), config)?;
            writer.write(batch)?;
            writer.finish()?.0
        }
        FileFormat::Csv => {
            let mut file = file;
            file.write_all(&encode_csv(batch)?)?;
            file
        }
    };
    file.sync_all()?;

    Ok(batch.num_rows())
}

/// Read a Parquet or CSV file back into one batch
///
/// CSV columns are typed by value inference, the same way decoded API
/// responses are.
pub fn read_batch(path: impl AsRef<Path>, format: FileFormat) -> Result<RecordBatch> {
    let path = path.as_ref();
    match format {
        FileFormat::Parquet => {
            let file = File::open(path)?;
            let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
            let schema = Arc::clone(builder.schema());
            let batches = builder
                .build()?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(concat_batches(&schema, &batches)?)
        }
        FileFormat::Csv => csv_to_arrow(&std::fs::read_to_string(path)?),
    }
}

/// Decode CSV text into one batch, typing columns by value inference
///
/// A header-only body gives an empty batch that still carries the header
/// columns, as nullable strings.
pub fn csv_to_arrow(body: &str) -> Result<RecordBatch> {
    let decoder = CsvDecoder::new();
    let records = decoder.decode(body)?;
    if !records.is_empty() {
        return json_to_arrow(&records, None);
    }

    let (headers, _) = decoder.decode_rows(body)?;
    let fields: Vec<Field> = headers
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    Ok(RecordBatch::new_empty(Arc::new(Schema::new(fields))))
}
