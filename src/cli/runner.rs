//! CLI runner - executes commands

use crate::cache::ResourceCache;
use crate::cli::commands::{Cli, Commands};
use crate::combine::{CombineOptions, CombineOutcome, Combiner};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RateLimiter, RateLimiterConfig};
use crate::output::FileSink;
use crate::pipeline::{
    AnalyticsPipeline, OpenDataPipeline, RunReport, TimedTextSource, TranscriptPipeline,
    VideoPipeline, WeatherPipeline,
};
use crate::types::FileFormat;
use crate::warehouse::{upload_file, ObjectStoreUploader, TableSchema, UploadAck, UploadOptions};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Videos {
                transcripts,
                lookback_days,
            } => {
                let mut config = config;
                if let Some(days) = lookback_days {
                    config.youtube.lookback_days = *days;
                }
                config.validate()?;
                self.videos(&config, *transcripts).await
            }
            Commands::Transcripts { max_concurrency } => {
                let mut config = config;
                if let Some(n) = max_concurrency {
                    config.youtube.max_concurrency = *n;
                }
                config.validate()?;
                let limiter = shared_limiter(&config);
                timed("transcripts", self.transcripts(&config, &limiter)).await
            }
            Commands::Weather {
                no_combine,
                no_overwrite,
            } => self.weather(&config, !*no_combine, !*no_overwrite).await,
            Commands::OpenData { package, resource } => {
                let mut config = config;
                if let Some(package) = package {
                    config.open_data.package_id.clone_from(package);
                }
                if resource.is_some() {
                    config.open_data.resource_name.clone_from(resource);
                }
                timed("open-data", self.open_data(&config)).await
            }
            Commands::Analytics { max_folders } => {
                let mut config = config;
                if let Some(n) = max_folders {
                    config.analytics.max_folders = *n;
                }
                config.validate()?;
                timed("analytics", self.analytics(&config)).await
            }
            Commands::Combine {
                dir,
                prefix,
                format,
                sort,
                no_overwrite,
            } => {
                let mut options = CombineOptions::default().overwrite(!*no_overwrite);
                if let Some(column) = sort {
                    options = options.sort_by(column);
                }
                let start = Instant::now();
                let outcome = Combiner::new(dir, (*format).into()).combine(prefix, &options)?;
                self.output_combine(&outcome);
                info!("Step 'combine' took {:.2?}", start.elapsed());
                Ok(())
            }
            Commands::Upload {
                path,
                table,
                mode,
                partition,
                schema,
                url,
            } => {
                let start = Instant::now();
                let url = url
                    .as_ref()
                    .or(config.warehouse.url.as_ref())
                    .ok_or_else(|| Error::missing_field("warehouse.url"))?;
                let uploader =
                    ObjectStoreUploader::from_url(url)?.with_retry(config.http.retry_policy());

                let mut options = UploadOptions::default()
                    .mode(mode.map_or(config.warehouse.mode, Into::into));
                if let Some(column) = partition
                    .as_ref()
                    .or(config.warehouse.partition_column.as_ref())
                {
                    options = options.partition_by(column);
                }
                if let Some(file) = schema.as_ref().or(config.warehouse.schema_file.as_ref()) {
                    options = options.schema(TableSchema::from_file(file)?);
                }

                let ack = upload_file(&uploader, path, table, &options).await?;
                self.output_upload(&ack);
                info!("Step 'upload' took {:.2?}", start.elapsed());
                Ok(())
            }
        }
    }

    /// Load the config file and apply global overrides
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.cli.config.as_deref())?;
        if let Some(dir) = &self.cli.data_dir {
            config.data_dir.clone_from(dir);
        }
        Ok(config)
    }

    async fn videos(&self, config: &PipelineConfig, with_transcripts: bool) -> Result<()> {
        let limiter = shared_limiter(config);

        timed("videos", async {
            let api_key = config.credentials.youtube()?;
            let client =
                HttpClient::with_shared_limiter(config.http.client_config(), limiter.clone())?;
            let sink = sink(config, &config.youtube.video_prefix, config.youtube.format)?;

            let report = VideoPipeline::new(&client, &config.youtube, api_key)
                .run(&sink)
                .await?;
            self.output_report(&report);
            Ok(())
        })
        .await?;

        if with_transcripts {
            timed("transcripts", self.transcripts(config, &limiter)).await?;
        }
        Ok(())
    }

    async fn transcripts(&self, config: &PipelineConfig, limiter: &RateLimiter) -> Result<()> {
        let client = HttpClient::with_shared_limiter(config.http.client_config(), limiter.clone())?;
        let source = TimedTextSource::new(
            client,
            config.youtube.transcript_url.clone(),
            Duration::from_secs(config.youtube.transcript_timeout_seconds),
        );
        // Transcripts read the video list from the same directory
        let sink = sink(config, &config.youtube.video_prefix, config.youtube.format)?;

        let report = TranscriptPipeline::new(&source, &config.youtube)
            .run(&sink)
            .await?;
        self.output_report(&report);
        Ok(())
    }

    async fn weather(&self, config: &PipelineConfig, combine: bool, overwrite: bool) -> Result<()> {
        let api_key = config.credentials.open_weather()?;
        let client = HttpClient::with_config(config.http.client_config())?;
        let sink = sink(config, &config.weather.prefix, config.weather.format)?;
        let pipeline = WeatherPipeline::new(&client, &config.weather, api_key);

        timed("weather", async {
            let report = pipeline.run(&sink).await?;
            self.output_report(&report);
            Ok(())
        })
        .await?;

        if combine {
            let start = Instant::now();
            let outcome = pipeline.combine(sink.dir(), overwrite)?;
            self.output_combine(&outcome);
            info!("Step 'combine' took {:.2?}", start.elapsed());
        }
        Ok(())
    }

    async fn open_data(&self, config: &PipelineConfig) -> Result<()> {
        let client = HttpClient::with_config(config.http.client_config())?;
        let sink = sink(config, &config.open_data.prefix, config.open_data.format)?;

        let report = OpenDataPipeline::new(&client, &config.open_data)
            .run(&sink)
            .await?;
        self.output_report(&report);
        Ok(())
    }

    async fn analytics(&self, config: &PipelineConfig) -> Result<()> {
        let client = HttpClient::with_config(config.http.client_config())?;
        let sink = sink(config, &config.analytics.prefix, config.analytics.format)?;
        let mut cache = ResourceCache::new(Duration::from_secs(config.analytics.cache_ttl_seconds));

        let report = AnalyticsPipeline::new(&client, &config.analytics)
            .run(&mut cache, &sink)
            .await?;
        self.output_report(&report);
        Ok(())
    }

    fn output_report(&self, report: &RunReport) {
        self.output_message(&json!({
            "type": "RUN",
            "pipeline": report.pipeline,
            "output": report.output.as_ref().map(|p| p.display().to_string()),
            "records": report.stats.records,
            "pages": report.stats.pages,
            "errors": report.stats.errors,
            "duration_ms": report.stats.duration_ms,
        }));
    }

    fn output_combine(&self, outcome: &CombineOutcome) {
        let msg = match outcome {
            CombineOutcome::Written {
                path,
                files_combined,
                files_skipped,
                rows,
            } => json!({
                "type": "COMBINE",
                "status": "WRITTEN",
                "output": path.display().to_string(),
                "files_combined": files_combined,
                "files_skipped": files_skipped,
                "rows": rows,
            }),
            CombineOutcome::SkippedExisting { path } => json!({
                "type": "COMBINE",
                "status": "SKIPPED_EXISTING",
                "output": path.display().to_string(),
            }),
            CombineOutcome::NoInput => json!({
                "type": "COMBINE",
                "status": "NO_INPUT",
            }),
        };
        self.output_message(&msg);
    }

    fn output_upload(&self, ack: &UploadAck) {
        self.output_message(&json!({
            "type": "UPLOAD",
            "table": ack.table_id,
            "mode": ack.mode,
            "objects": ack.objects,
            "replaced": ack.replaced,
            "rows": ack.rows,
        }));
    }

    /// One JSON message per line on stdout
    fn output_message(&self, msg: &Value) {
        println!("{}", serde_json::to_string(msg).unwrap_or_default());
    }
}

/// One limiter for every client talking to the YouTube API
fn shared_limiter(config: &PipelineConfig) -> RateLimiter {
    RateLimiter::new(&RateLimiterConfig::new(
        config.http.rate_limit.requests_per_second,
        config.http.rate_limit.burst_size,
    ))
}

fn sink(config: &PipelineConfig, name: &str, format: FileFormat) -> Result<FileSink> {
    FileSink::new(config.dataset_dir(name), format)
}

/// Run a step and log how long it took
async fn timed<F>(step: &str, fut: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let start = Instant::now();
    info!("Starting step '{}'", step);
    let result = fut.await;
    info!("Step '{}' took {:.2?}", step, start.elapsed());
    result
}
