//! Combiner implementation

use crate::error::{Error, Result};
use crate::output::{
    combined_file_name, list_sink_files, read_batch, unify_batches, validate_prefix,
    write_batch, ParquetWriterConfig,
};
use crate::types::FileFormat;
use arrow::compute::{sort_to_indices, take_record_batch, SortOptions};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for one combine run
#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// Sort ascending by this column when the combined schema has it
    pub sort_column: Option<String>,
    /// Replace an existing combined file; when false an existing file is kept
    pub overwrite: bool,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            sort_column: None,
            overwrite: true,
        }
    }
}

impl CombineOptions {
    /// Sort by `column`
    #[must_use]
    pub fn sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_column = Some(column.into());
        self
    }

    /// Set overwrite behaviour
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// What a combine run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineOutcome {
    /// The combined file was (re)written
    Written {
        path: PathBuf,
        files_combined: usize,
        files_skipped: usize,
        rows: usize,
    },
    /// A combined file exists and overwrite was off; nothing was written
    SkippedExisting { path: PathBuf },
    /// No readable, non-empty input file; nothing was written
    NoInput,
}

impl CombineOutcome {
    /// Path of the combined file, if one exists after the run
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Written { path, .. } | Self::SkippedExisting { path } => Some(path),
            Self::NoInput => None,
        }
    }
}

/// Merges sink files of one directory and format
#[derive(Debug, Clone)]
pub struct Combiner {
    dir: PathBuf,
    format: FileFormat,
    parquet: ParquetWriterConfig,
}

impl Combiner {
    /// Combiner over `dir` for files of `format`
    pub fn new(dir: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            parquet: ParquetWriterConfig::default(),
        }
    }

    /// Combine all sink files of `prefix`
    ///
    /// A missing directory is an error. Per-file read failures are logged and
    /// counted in `files_skipped`.
    pub fn combine(&self, prefix: &str, options: &CombineOptions) -> Result<CombineOutcome> {
        validate_prefix(prefix)?;
        if !self.dir.is_dir() {
            return Err(Error::directory_not_found(&self.dir));
        }

        let output = self.dir.join(combined_file_name(prefix, self.format));
        if output.exists() && !options.overwrite {
            info!("{} already exists, skipping", output.display());
            return Ok(CombineOutcome::SkippedExisting { path: output });
        }

        let files = list_sink_files(&self.dir, prefix, self.format)?;
        info!("Found {} {} files to combine", files.len(), self.format);

        let mut batches = Vec::with_capacity(files.len());
        let mut skipped = 0;
        for (_, path) in &files {
            match read_batch(path, self.format) {
                Ok(batch) if batch.num_rows() > 0 => {
                    debug!("Read {} rows from {}", batch.num_rows(), path.display());
                    batches.push(batch);
                }
                Ok(_) => {
                    warn!("{} is empty, skipping", path.display());
                    skipped += 1;
                }
                Err(e) => {
                    warn!("Error reading {}: {}", path.display(), e);
                    skipped += 1;
                }
            }
        }

        if batches.is_empty() {
            warn!("No valid data found for prefix '{}'", prefix);
            return Ok(CombineOutcome::NoInput);
        }

        let mut combined = unify_batches(&batches)?;
        if let Some(column) = &options.sort_column {
            combined = sort_batch(&combined, column)?;
        }

        let temp = self.dir.join(format!(
            ".{}.tmp",
            combined_file_name(prefix, self.format)
        ));
        if let Err(e) = write_batch(&temp, &combined, self.format, &self.parquet) {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
        std::fs::rename(&temp, &output)?;

        info!(
            "Combined {} files into {} ({} rows)",
            batches.len(),
            output.display(),
            combined.num_rows()
        );

        Ok(CombineOutcome::Written {
            path: output,
            files_combined: batches.len(),
            files_skipped: skipped,
            rows: combined.num_rows(),
        })
    }
}

/// Sort ascending by `column`, nulls last; a batch without it is returned as is
fn sort_batch(batch: &RecordBatch, column: &str) -> Result<RecordBatch> {
    let Some(values) = batch.column_by_name(column) else {
        debug!("Sort column '{}' not present, keeping file order", column);
        return Ok(batch.clone());
    };
    if values.data_type() == &DataType::Null {
        return Ok(batch.clone());
    }

    let options = SortOptions {
        descending: false,
        nulls_first: false,
    };
    let indices = sort_to_indices(values.as_ref(), Some(options), None)?;
    Ok(take_record_batch(batch, &indices)?)
}
