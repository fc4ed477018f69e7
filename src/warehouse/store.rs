//! Object-store backed warehouse (S3, R2, GCS, Azure, local)
//!
//! A table is a key prefix. Every upload adds Parquet objects under
//! `{table}/[{column}={value}/]part-{timestamp}-{n}.parquet`; an overwrite
//! removes the objects that were there before the upload started.
//!
//! Table ids nest (`ds` and `ds.events` share the `ds/` prefix), so a table
//! only owns the part files directly under its prefix or one partition
//! directory below it. Table segments never contain `=`.

use super::types::{UploadAck, UploadOptions, Uploader};
use super::validate::validate_batch;
use crate::error::{Error, Result};
use crate::output::{encode_parquet, ParquetWriterConfig};
use crate::retry::RetryPolicy;
use crate::types::WriteMode;
use arrow::array::{StringArray, UInt32Array};
use arrow::compute::{cast, take_record_batch};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

/// Partition directory used for null or empty partition values
pub const NULL_PARTITION: &str = "__null__";

static TABLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").unwrap());

/// Uploader writing Parquet objects to an [`ObjectStore`]
#[derive(Debug)]
pub struct ObjectStoreUploader {
    store: Arc<dyn ObjectStore>,
    /// Key prefix inside the bucket or container
    prefix: String,
    /// URL scheme, for logging
    scheme: String,
    retry: RetryPolicy,
    parquet: ParquetWriterConfig,
    counter: AtomicU64,
}

impl ObjectStoreUploader {
    /// Wrap an existing store
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            scheme: scheme.into(),
            retry: RetryPolicy::default(),
            parquet: ParquetWriterConfig::default(),
            counter: AtomicU64::new(0),
        }
    }

    /// Build a store from a warehouse URL
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (endpoint from `R2_ENDPOINT_URL`)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `/local/path/`, `./path/` or `file://path` - Local filesystem
    ///
    /// Credentials come from the usual provider environment variables.
    pub fn from_url(url: &str) -> Result<Self> {
        let Some((scheme, rest)) = url.split_once("://").filter(|(s, _)| *s != "file") else {
            return Self::local(url.strip_prefix("file://").unwrap_or(url));
        };

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(Error::InvalidConfigValue {
                field: "warehouse.url".to_string(),
                message: format!("no bucket in '{url}'"),
            });
        }

        let store: Arc<dyn ObjectStore> = match scheme {
            "s3" | "r2" => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if scheme == "r2" {
                    if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                        let endpoint = url::Url::parse(&endpoint)?;
                        builder = builder.with_endpoint(endpoint.as_str().trim_end_matches('/'));
                    }
                }
                Arc::new(builder.build()?)
            }
            "gs" => Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .build()?,
            ),
            "az" => Arc::new(
                MicrosoftAzureBuilder::from_env()
                    .with_container_name(bucket)
                    .build()?,
            ),
            other => {
                return Err(Error::InvalidConfigValue {
                    field: "warehouse.url".to_string(),
                    message: format!("unsupported scheme '{other}'"),
                })
            }
        };

        Ok(Self::new(store, prefix, scheme))
    }

    fn local(path: &str) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        let store = LocalFileSystem::new_with_prefix(path)?;
        Ok(Self::new(Arc::new(store), "", "file"))
    }

    /// Override the retry policy for store calls
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL scheme (s3, r2, gs, az, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether objects leave the local machine
    pub fn is_cloud(&self) -> bool {
        self.scheme != "file"
    }

    /// Object paths currently stored for `table_id`, sorted
    ///
    /// Objects of nested tables (`ds.events` under `ds`) are not included.
    pub async fn list_table(&self, table_id: &str) -> Result<Vec<ObjectPath>> {
        let prefix = self.table_path(table_id)?;
        let mut paths: Vec<ObjectPath> = self
            .retry
            .run("list table", || {
                let store = Arc::clone(&self.store);
                let prefix = prefix.clone();
                async move {
                    let listed = store.list(Some(&prefix)).try_collect::<Vec<_>>().await;
                    match listed {
                        Ok(metas) => Ok(metas.into_iter().map(|m| m.location).collect::<Vec<_>>()),
                        Err(object_store::Error::NotFound { .. }) => Ok(Vec::new()),
                        Err(e) => Err(Error::from(e)),
                    }
                }
            })
            .await?;
        paths.retain(|path| is_table_object(&prefix, path));
        paths.sort();
        Ok(paths)
    }

    fn table_path(&self, table_id: &str) -> Result<ObjectPath> {
        if !TABLE_ID.is_match(table_id) {
            return Err(Error::InvalidConfigValue {
                field: "table_id".to_string(),
                message: format!("'{table_id}' is not a valid table id"),
            });
        }
        let table = table_id.replace('.', "/");
        Ok(if self.prefix.is_empty() {
            ObjectPath::from(table)
        } else {
            ObjectPath::from(format!("{}/{table}", self.prefix))
        })
    }

    async fn put(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        self.retry
            .run("put object", || {
                let store = Arc::clone(&self.store);
                let path = path.clone();
                let data = data.clone();
                async move {
                    store.put(&path, data.into()).await?;
                    Ok(())
                }
            })
            .await
    }

    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        self.retry
            .run("delete object", || {
                let store = Arc::clone(&self.store);
                let path = path.clone();
                async move {
                    match store.delete(&path).await {
                        Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
                        Err(e) => Err(Error::from(e)),
                    }
                }
            })
            .await
    }

    fn part_name(&self) -> String {
        format!(
            "part-{}-{:04}.parquet",
            Utc::now().format("%Y%m%dT%H%M%S%6f"),
            self.counter.fetch_add(1, Ordering::Relaxed)
        )
    }
}

#[async_trait]
impl Uploader for ObjectStoreUploader {
    async fn upload(
        &self,
        batch: &RecordBatch,
        table_id: &str,
        options: &UploadOptions,
    ) -> Result<UploadAck> {
        let table = self.table_path(table_id)?;
        if let Some(schema) = &options.schema {
            validate_batch(batch, schema)?;
        }

        let parts = match &options.partition_column {
            Some(column) => split_by_partition(batch, column)?
                .into_iter()
                .map(|(value, part)| (Some(format!("{column}={value}")), part))
                .collect(),
            None => vec![(None, batch.clone())],
        };

        let previous = match options.mode {
            WriteMode::Overwrite => self.list_table(table_id).await?,
            WriteMode::Append => Vec::new(),
        };

        let mut objects = Vec::with_capacity(parts.len());
        for (dir, part) in parts {
            let name = self.part_name();
            let path = match dir {
                Some(dir) => ObjectPath::from(format!("{table}/{dir}/{name}")),
                None => ObjectPath::from(format!("{table}/{name}")),
            };
            let data = encode_parquet(&part, &self.parquet)?;
            debug!("Uploading {} rows ({} bytes) to {}", part.num_rows(), data.len(), path);
            self.put(&path, data).await?;
            objects.push(format!("{}://{path}", self.scheme));
        }

        for path in &previous {
            self.delete(path).await?;
        }

        info!(
            "Uploaded {} rows to {} ({} objects{})",
            batch.num_rows(),
            table_id,
            objects.len(),
            if previous.is_empty() {
                String::new()
            } else {
                format!(", replaced {}", previous.len())
            }
        );

        Ok(UploadAck {
            table_id: table_id.to_string(),
            mode: options.mode,
            objects,
            replaced: previous.len(),
            rows: batch.num_rows(),
        })
    }
}

/// Whether `path` is a part file of the table at `table`, either directly or
/// inside one `{column}={value}` directory
fn is_table_object(table: &ObjectPath, path: &ObjectPath) -> bool {
    let Some(parts) = path.prefix_match(table) else {
        return false;
    };
    let parts: Vec<_> = parts.collect();
    let is_part = |name: &str| name.starts_with("part-") && name.ends_with(".parquet");
    match parts.as_slice() {
        [file] => is_part(file.as_ref()),
        [dir, file] => dir.as_ref().contains('=') && is_part(file.as_ref()),
        _ => false,
    }
}

/// Split `batch` by the values of `column`, in first-seen order
fn split_by_partition(batch: &RecordBatch, column: &str) -> Result<Vec<(String, RecordBatch)>> {
    let values = batch
        .column_by_name(column)
        .ok_or_else(|| Error::missing_column(column))?;
    let values = cast(values, &DataType::Utf8)?;
    let values = values
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::output(format!("Partition column '{column}' is not castable to string")))?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<u32>)> = Vec::new();
    for (row, value) in values.iter().enumerate() {
        let key = match value {
            Some(v) if !v.is_empty() => v.replace(['/', '\\', '='], "_"),
            _ => NULL_PARTITION.to_string(),
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row as u32);
    }

    groups
        .into_iter()
        .map(|(key, rows)| Ok((key, take_record_batch(batch, &UInt32Array::from(rows))?)))
        .collect()
}
