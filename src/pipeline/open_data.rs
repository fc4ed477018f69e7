//! CKAN datastore dump pipeline

use super::ckan::CkanClient;
use super::types::RunReport;
use crate::config::OpenDataConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::{csv_to_arrow, FileSink};
use arrow::record_batch::RecordBatch;
use std::time::Instant;
use tracing::{info, warn};

/// Downloads one datastore resource of a package as CSV
pub struct OpenDataPipeline<'a> {
    client: &'a HttpClient,
    config: &'a OpenDataConfig,
}

impl<'a> OpenDataPipeline<'a> {
    pub fn new(client: &'a HttpClient, config: &'a OpenDataConfig) -> Self {
        Self { client, config }
    }

    /// Resolve the resource and download all of its rows
    pub async fn fetch(&self) -> Result<RecordBatch> {
        let ckan = CkanClient::new(self.client, &self.config.base_url);
        let resources = ckan.package_resources(&self.config.package_id).await?;

        let resource = resources
            .iter()
            .filter(|r| r.datastore_active)
            .find(|r| {
                self.config
                    .resource_name
                    .as_ref()
                    .map_or(true, |name| &r.name == name)
            })
            .ok_or_else(|| Error::InvalidConfigValue {
                field: "open_data.resource_name".to_string(),
                message: format!(
                    "no datastore resource {}in package '{}'",
                    self.config
                        .resource_name
                        .as_ref()
                        .map_or_else(String::new, |n| format!("named '{n}' ")),
                    self.config.package_id
                ),
            })?;

        info!("Downloading datastore dump of '{}' ({})", resource.name, resource.id);
        let csv = ckan.datastore_dump(&resource.id).await?;
        csv_to_arrow(&csv)
    }

    /// Download and write to a new sink file
    pub async fn run(&self, sink: &FileSink) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new("open-data");

        let batch = self.fetch().await?;
        report.stats.add_page();

        if batch.num_columns() == 0 {
            warn!("Datastore dump of '{}' is empty, nothing written", self.config.package_id);
            report.stats.finish(start);
            return Ok(report);
        }
        if batch.num_rows() == 0 {
            warn!("Datastore dump of '{}' has a header but no rows", self.config.package_id);
        }

        report.output = Some(sink.write(&batch, &self.config.prefix)?);
        report.stats.add_records(batch.num_rows());
        report.stats.finish(start);
        Ok(report)
    }
}
