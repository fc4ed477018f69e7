//! Uploading sink and combined files

use super::types::{UploadAck, UploadOptions, Uploader};
use crate::error::{Error, Result};
use crate::output::read_batch;
use crate::types::FileFormat;
use std::path::Path;
use tracing::info;

/// Read a CSV or Parquet file and upload its rows to `table_id`
///
/// The format is taken from the file extension.
pub async fn upload_file(
    uploader: &dyn Uploader,
    path: impl AsRef<Path>,
    table_id: &str,
    options: &UploadOptions,
) -> Result<UploadAck> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(FileFormat::from_extension)
        .ok_or_else(|| Error::InvalidConfigValue {
            field: "path".to_string(),
            message: format!("cannot tell the format of {}", path.display()),
        })?;

    let batch = read_batch(path, format)?;
    info!("Read {} rows from {}", batch.num_rows(), path.display());

    uploader.upload(&batch, table_id, options).await
}
