//! Timestamped file sink
//!
//! Every write lands in a new file named `{prefix}_{YYYY-MM-DD_HH.MM.SS}.{ext}`.
//! A `-{n}` suffix separates writes that fall in the same second. Files are
//! written under a temporary name and hard-linked into place, so a final name
//! only ever refers to a complete file and is never reused.

use super::writer::{write_batch, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::types::FileFormat;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";
const TIMESTAMP_LEN: usize = "YYYY-MM-DD_HH.MM.SS".len();

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Parsed name of a sink file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFileName {
    /// Logical dataset name
    pub prefix: String,
    /// Second the write started, as encoded in the name
    pub timestamp: NaiveDateTime,
    /// Same-second disambiguator, 0 when absent
    pub seq: u32,
    /// File format
    pub format: FileFormat,
}

impl SinkFileName {
    /// Parse `file_name` as a sink file of `prefix`
    ///
    /// Returns `None` for anything else, including `{prefix}_combined.{ext}`.
    pub fn parse(prefix: &str, file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        let format = FileFormat::from_extension(ext)?;
        let rest = stem.strip_prefix(prefix)?.strip_prefix('_')?;

        if rest.len() < TIMESTAMP_LEN || !rest.is_char_boundary(TIMESTAMP_LEN) {
            return None;
        }
        let (ts, suffix) = rest.split_at(TIMESTAMP_LEN);
        let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()?;

        let seq = match suffix {
            "" => 0,
            s => {
                let digits = s.strip_prefix('-')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()?
            }
        };

        Some(Self {
            prefix: prefix.to_string(),
            timestamp,
            seq,
            format,
        })
    }

    /// Render the file name
    pub fn render(&self) -> String {
        let ts = self.timestamp.format(TIMESTAMP_FORMAT);
        if self.seq == 0 {
            format!("{}_{ts}.{}", self.prefix, self.format.extension())
        } else {
            format!("{}_{ts}-{}.{}", self.prefix, self.seq, self.format.extension())
        }
    }

    fn order_key(&self) -> (NaiveDateTime, u32) {
        (self.timestamp, self.seq)
    }
}

/// Name of the combined output for a prefix
pub fn combined_file_name(prefix: &str, format: FileFormat) -> String {
    format!("{prefix}_combined.{}", format.extension())
}

/// List sink files for `prefix` in `dir`, oldest first by encoded timestamp
pub fn list_sink_files(
    dir: &Path,
    prefix: &str,
    format: FileFormat,
) -> Result<Vec<(SinkFileName, PathBuf)>> {
    if !dir.is_dir() {
        return Err(Error::directory_not_found(dir));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(parsed) = SinkFileName::parse(prefix, name) {
            if parsed.format == format {
                files.push((parsed, entry.path()));
            }
        }
    }

    files.sort_by(|(a, _), (b, _)| a.order_key().cmp(&b.order_key()));
    Ok(files)
}

/// Writes batches into timestamped, never-overwritten files
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    format: FileFormat,
    parquet: ParquetWriterConfig,
}

impl FileSink {
    /// Create a sink rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>, format: FileFormat) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::output(format!("Failed to create directory {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            format,
            parquet: ParquetWriterConfig::default(),
        })
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output format
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Write `batch` to a new file for `prefix` and return its path
    pub fn write(&self, batch: &RecordBatch, prefix: &str) -> Result<PathBuf> {
        self.write_at(batch, prefix, Utc::now())
    }

    /// Write with an explicit timestamp for the file name
    pub fn write_at(&self, batch: &RecordBatch, prefix: &str, at: DateTime<Utc>) -> Result<PathBuf> {
        validate_prefix(prefix)?;

        let mut name = SinkFileName {
            prefix: prefix.to_string(),
            timestamp: at.naive_utc(),
            seq: 0,
            format: self.format,
        };

        let temp = self.dir.join(format!(
            ".{}.{}-{}.tmp",
            name.render(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_batch(&temp, batch, self.format, &self.parquet) {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }

        let target = loop {
            let candidate = self.dir.join(name.render());
            match std::fs::hard_link(&temp, &candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, bumping sequence", candidate.display());
                    name.seq += 1;
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&temp);
                    return Err(e.into());
                }
            }
        };
        std::fs::remove_file(&temp)?;

        info!("Wrote {} rows to {}", batch.num_rows(), target.display());
        Ok(target)
    }

    /// All sink files for `prefix`, oldest first
    pub fn list(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        Ok(list_sink_files(&self.dir, prefix, self.format)?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    /// Most recent sink file for `prefix` by the timestamp in its name
    pub fn latest(&self, prefix: &str) -> Result<Option<PathBuf>> {
        Ok(list_sink_files(&self.dir, prefix, self.format)?
            .pop()
            .map(|(_, path)| path))
    }
}

pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() || prefix.contains(['/', '\\']) || prefix.starts_with('.') {
        return Err(Error::InvalidConfigValue {
            field: "prefix".to_string(),
            message: format!("'{prefix}' is not a valid file prefix"),
        });
    }
    Ok(())
}
