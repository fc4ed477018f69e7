//! Current weather pipeline

use super::types::RunReport;
use crate::combine::{CombineOptions, CombineOutcome, Combiner};
use crate::config::WeatherConfig;
use crate::error::Result;
use crate::extract::{extract_weather_record, records_to_batch, WeatherRecord};
use crate::http::{HttpClient, RequestConfig};
use crate::output::FileSink;
use chrono::Local;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// One observation per run, appended to a directory of sink files
pub struct WeatherPipeline<'a> {
    client: &'a HttpClient,
    config: &'a WeatherConfig,
    api_key: &'a str,
}

impl<'a> WeatherPipeline<'a> {
    pub fn new(client: &'a HttpClient, config: &'a WeatherConfig, api_key: &'a str) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }

    /// Fetch current conditions for the configured location
    ///
    /// `request_datetime` is the local wall-clock time of the request.
    pub async fn fetch(&self) -> Result<WeatherRecord> {
        let location = self.config.location();
        info!("Fetching weather data for {}", location);

        let requested_at = Local::now().naive_local();
        let body = self
            .client
            .get_text_with_config(
                &self.config.url,
                RequestConfig::new()
                    .query("q", &location)
                    .query("appid", self.api_key),
            )
            .await?;

        let record = extract_weather_record(&body, requested_at)?;
        info!(
            "{}: {} at {:.1}F",
            record.city_name, record.weather_description, record.temp_fahrenheit
        );
        Ok(record)
    }

    /// Fetch one observation and write it to a new sink file
    pub async fn run(&self, sink: &FileSink) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new("weather");

        let record = self.fetch().await?;
        report.stats.add_page();

        let batch = records_to_batch(&[record])?;
        report.output = Some(sink.write(&batch, &self.config.prefix)?);
        report.stats.add_records(batch.num_rows());
        report.stats.finish(start);
        Ok(report)
    }

    /// Merge every observation file in `dir`, sorted by request time
    pub fn combine(&self, dir: &Path, overwrite: bool) -> Result<CombineOutcome> {
        Combiner::new(dir, self.config.format).combine(
            &self.config.prefix,
            &CombineOptions::default()
                .sort_by(&self.config.sort_column)
                .overwrite(overwrite),
        )
    }
}
