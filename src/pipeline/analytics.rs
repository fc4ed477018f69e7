//! Web analytics report pipeline
//!
//! The portal publishes a zip with one folder per weekly report. The zip is
//! located through CKAN, downloaded through the resource cache, and the
//! metrics CSV of the first few folders is stacked into one table with a
//! `source_folder` column.

use super::ckan::CkanClient;
use super::types::{RunReport, RunStats};
use crate::cache::ResourceCache;
use crate::config::AnalyticsConfig;
use crate::decode::{DecoderFormat, RecordDecoder};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::{json_to_arrow, unify_batches, FileSink};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Column naming the report folder each row came from
pub const SOURCE_FOLDER_COLUMN: &str = "source_folder";

/// Locates, downloads and flattens the analytics zip
pub struct AnalyticsPipeline<'a> {
    client: &'a HttpClient,
    config: &'a AnalyticsConfig,
}

impl<'a> AnalyticsPipeline<'a> {
    pub fn new(client: &'a HttpClient, config: &'a AnalyticsConfig) -> Self {
        Self { client, config }
    }

    /// URL of the report zip
    ///
    /// Only resources outside the datastore are looked up; a lookup that
    /// fails is logged and the search continues.
    pub async fn find_report_url(&self) -> Result<String> {
        let ckan = CkanClient::new(self.client, &self.config.base_url);
        let resources = ckan.package_resources(&self.config.package_id).await?;

        for resource in resources.iter().filter(|r| !r.datastore_active) {
            match ckan.resource(&resource.id).await {
                Ok(meta) if meta.name == self.config.resource_name => {
                    if let Some(url) = meta.url.filter(|u| !u.is_empty()) {
                        info!("Found '{}' at {}", meta.name, url);
                        return Ok(url);
                    }
                    warn!("Resource '{}' has no URL", meta.name);
                }
                Ok(meta) => debug!("Skipping resource '{}'", meta.name),
                Err(e) => warn!("Error retrieving metadata for '{}': {}", resource.name, e),
            }
        }

        Err(Error::InvalidConfigValue {
            field: "analytics.resource_name".to_string(),
            message: format!(
                "resource '{}' not found in package '{}'",
                self.config.resource_name, self.config.package_id
            ),
        })
    }

    /// Download the zip, served from `cache` while it is fresh
    pub async fn download(&self, cache: &mut ResourceCache<Bytes>, url: &str) -> Result<Bytes> {
        let timeout = Duration::from_secs(self.config.download_timeout_seconds);
        cache
            .get_or_fetch_with_timeout(url, timeout, || self.client.get_bytes(url))
            .await
    }

    /// Locate, download and flatten the report
    pub async fn fetch(
        &self,
        cache: &mut ResourceCache<Bytes>,
        stats: &mut RunStats,
    ) -> Result<RecordBatch> {
        let url = self.find_report_url().await?;
        let payload = self.download(cache, &url).await?;
        combine_report_metrics(
            &payload,
            &self.config.metrics_file,
            self.config.max_folders,
            stats,
        )
    }

    /// Fetch and write to a new sink file
    pub async fn run(&self, cache: &mut ResourceCache<Bytes>, sink: &FileSink) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new("analytics");

        let batch = self.fetch(cache, &mut report.stats).await?;
        if batch.num_columns() == 0 {
            warn!("No {} found in the report, nothing written", self.config.metrics_file);
            report.stats.finish(start);
            return Ok(report);
        }

        report.output = Some(sink.write(&batch, &self.config.prefix)?);
        report.stats.add_records(batch.num_rows());
        report.stats.finish(start);
        Ok(report)
    }
}

/// Report folders in the archive, sorted, at most `max_folders`
pub fn report_folders<R: Read + std::io::Seek>(
    archive: &ZipArchive<R>,
    max_folders: usize,
) -> Vec<String> {
    archive
        .file_names()
        .filter_map(|name| name.rsplit_once('/').map(|(dir, _)| dir))
        .filter(|dir| !dir.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(max_folders)
        .collect()
}

/// Stack `metrics_file` from each report folder of a zip
///
/// A folder without the file is skipped; a file that cannot be read or
/// parsed is logged and counted as an error. Folders whose columns differ
/// are unified.
pub fn combine_report_metrics(
    zip: &Bytes,
    metrics_file: &str,
    max_folders: usize,
    stats: &mut RunStats,
) -> Result<RecordBatch> {
    let mut archive = ZipArchive::new(Cursor::new(zip.clone()))?;
    let folders = report_folders(&archive, max_folders);
    info!("Found {} report folders", folders.len());

    let decoder = DecoderFormat::detect(metrics_file).decoder(None);
    let mut batches = Vec::with_capacity(folders.len());
    for folder in &folders {
        let name = format!("{folder}/{metrics_file}");
        let mut raw = Vec::new();
        match archive.by_name(&name) {
            Ok(mut file) => {
                if let Err(e) = file.read_to_end(&mut raw) {
                    warn!("Error reading {}: {}", name, e);
                    stats.add_error();
                    continue;
                }
            }
            Err(zip::result::ZipError::FileNotFound) => {
                debug!("No {} in {}", metrics_file, folder);
                continue;
            }
            Err(e) => {
                warn!("Error opening {}: {}", name, e);
                stats.add_error();
                continue;
            }
        }
        stats.add_page();

        let text = String::from_utf8_lossy(&raw);
        let batch = decoder.decode(&text).and_then(|mut records| {
            for record in &mut records {
                if let Value::Object(row) = record {
                    row.insert(
                        SOURCE_FOLDER_COLUMN.to_string(),
                        Value::String(folder.clone()),
                    );
                }
            }
            json_to_arrow(&records, None)
        });

        match batch {
            Ok(batch) if batch.num_rows() > 0 => {
                info!("Added {} rows from {}", batch.num_rows(), folder);
                batches.push(batch);
            }
            Ok(_) => debug!("{} is empty", name),
            Err(e) => {
                warn!("Error parsing {}: {}", name, e);
                stats.add_error();
            }
        }
    }

    unify_batches(&batches)
}
