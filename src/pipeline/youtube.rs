//! Video list and transcript pipelines

use super::types::{RunReport, RunStats};
use crate::config::YouTubeConfig;
use crate::error::{Error, Result};
use crate::extract::{
    clean_transcript, extract_video_page, parse_timed_text, records_to_batch, VideoFilter,
    VideoRecord, NO_TRANSCRIPT,
};
use crate::http::{HttpClient, RequestConfig};
use crate::output::{coerce_timestamps, read_batch, timestamp_type, FileSink};
use crate::pagination::{PaginationState, Paginator, TokenPaginator};
use arrow::array::{Array, StringArray, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::DateTime;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// Video List
// ============================================================================

/// Lists a channel's recent uploads through the search endpoint
pub struct VideoPipeline<'a> {
    client: &'a HttpClient,
    config: &'a YouTubeConfig,
    api_key: &'a str,
}

impl<'a> VideoPipeline<'a> {
    pub fn new(client: &'a HttpClient, config: &'a YouTubeConfig, api_key: &'a str) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }

    /// Walk every search page and keep the videos inside the lookback window
    pub async fn fetch_videos(
        &self,
        filter: &VideoFilter,
        stats: &mut RunStats,
    ) -> Result<Vec<VideoRecord>> {
        let paginator = match self.config.max_pages {
            Some(max) => TokenPaginator::youtube().with_max_pages(max),
            None => TokenPaginator::youtube(),
        };
        let mut state = PaginationState::new();
        let mut videos = Vec::new();

        loop {
            let mut request = RequestConfig::new()
                .query("key", self.api_key)
                .query("channelId", &self.config.channel_id)
                .query("part", "snippet,id")
                .query("order", "date")
                .query("maxResults", self.config.max_results.to_string());
            for (key, value) in paginator.initial_params(&state) {
                request = request.query(key, value);
            }

            let page: Value = self
                .client
                .get_json_with_config(&self.config.search_url, request)
                .await?;
            stats.add_page();

            let records = extract_video_page(&page, filter)?;
            debug!("Page {}: kept {} videos", state.pages + 1, records.len());
            let count = records.len();
            videos.extend(records);

            if paginator.process_response(&page, count, &mut state).is_done() {
                break;
            }
        }

        info!(
            "Found {} videos published since {} in {} pages",
            videos.len(),
            filter.cutoff().format("%Y-%m-%d %H:%M:%S"),
            state.pages
        );
        Ok(videos)
    }

    /// Fetch the video list and write it to a new sink file
    pub async fn run(&self, sink: &FileSink) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new("videos");

        let filter = VideoFilter::new(self.config.lookback_days);
        let videos = self.fetch_videos(&filter, &mut report.stats).await?;

        let batch = records_to_batch(&videos)?;
        report.output = Some(sink.write(&batch, &self.config.video_prefix)?);
        report.stats.add_records(batch.num_rows());
        report.stats.finish(start);
        Ok(report)
    }
}

// ============================================================================
// Transcripts
// ============================================================================

/// Source of raw transcript text for one video
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Transcript text of `video_id`, uncleaned
    async fn fetch(&self, video_id: &str) -> Result<String>;
}

/// Timed-text XML endpoint
pub struct TimedTextSource {
    client: HttpClient,
    url_template: String,
    timeout: Duration,
}

impl TimedTextSource {
    /// `url_template` must contain `{video_id}`
    pub fn new(client: HttpClient, url_template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url_template: url_template.into(),
            timeout,
        }
    }

    pub fn url_for(&self, video_id: &str) -> String {
        self.url_template.replace("{video_id}", video_id)
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    async fn fetch(&self, video_id: &str) -> Result<String> {
        let xml = self
            .client
            .get_text_with_config(
                &self.url_for(video_id),
                RequestConfig::new().timeout(self.timeout),
            )
            .await?;
        parse_timed_text(&xml)
    }
}

/// Fetch transcripts with at most `max_concurrency` requests in flight
///
/// Results line up with `video_ids` whatever order the fetches finish in.
pub async fn fetch_transcripts(
    source: &dyn TranscriptSource,
    video_ids: &[String],
    max_concurrency: usize,
) -> Vec<Result<String>> {
    let mut results: Vec<(usize, Result<String>)> = stream::iter(video_ids.iter().enumerate())
        .map(|(index, video_id)| async move { (index, source.fetch(video_id).await) })
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

/// Adds cleaned transcripts to the most recent video list
pub struct TranscriptPipeline<'a> {
    source: &'a dyn TranscriptSource,
    config: &'a YouTubeConfig,
}

impl<'a> TranscriptPipeline<'a> {
    pub fn new(source: &'a dyn TranscriptSource, config: &'a YouTubeConfig) -> Self {
        Self { source, config }
    }

    /// Attach a transcript to every video; failures get the placeholder
    pub async fn transcribe(
        &self,
        videos: Vec<VideoRecord>,
        stats: &mut RunStats,
    ) -> Vec<VideoRecord> {
        let ids: Vec<String> = videos.iter().map(|v| v.video_id.clone()).collect();
        let transcripts = fetch_transcripts(self.source, &ids, self.config.max_concurrency).await;

        videos
            .into_iter()
            .zip(transcripts)
            .map(|(mut video, transcript)| {
                stats.add_page();
                video.transcript = Some(match transcript {
                    Ok(text) => clean_transcript(&text),
                    Err(e) => {
                        warn!("No transcript for {}: {}", video.video_id, e);
                        stats.add_error();
                        NO_TRANSCRIPT.to_string()
                    }
                });
                video
            })
            .collect()
    }

    /// Read the latest video list from `sink`, transcribe, write a new file
    pub async fn run(&self, sink: &FileSink) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new("transcripts");

        let latest = sink
            .latest(&self.config.video_prefix)?
            .ok_or_else(|| Error::FileNotFound {
                path: sink
                    .dir()
                    .join(format!("{}_*.{}", self.config.video_prefix, sink.format()))
                    .display()
                    .to_string(),
            })?;
        info!("Reading video list from {}", latest.display());

        let videos = video_records_from_batch(&read_batch(&latest, sink.format())?)?;
        let videos = self.transcribe(videos, &mut report.stats).await;

        let batch = records_to_batch(&videos)?;
        report.output = Some(sink.write(&batch, &self.config.transcript_prefix)?);
        report.stats.add_records(batch.num_rows());
        report.stats.finish(start);
        Ok(report)
    }
}

/// Rebuild video records from a stored video list (Parquet or CSV)
///
/// Rows without a `video_id` or `published_at` are dropped.
pub fn video_records_from_batch(batch: &RecordBatch) -> Result<Vec<VideoRecord>> {
    let batch = coerce_timestamps(batch, &["published_at"])?;

    let ids = string_column(&batch, "video_id")?
        .ok_or_else(|| Error::missing_column("video_id"))?;
    let titles = string_column(&batch, "title")?;
    let published = batch
        .column_by_name("published_at")
        .ok_or_else(|| Error::missing_column("published_at"))?;
    let published = cast(published, &timestamp_type())?;
    let published = published
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| Error::ColumnType {
            column: "published_at".to_string(),
            expected: "timestamp".to_string(),
            found: published.data_type().to_string(),
        })?;

    let mut videos = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if ids.is_null(row) || published.is_null(row) {
            continue;
        }
        let Some(published_at) = DateTime::from_timestamp_micros(published.value(row)) else {
            continue;
        };
        videos.push(VideoRecord {
            video_id: ids.value(row).to_string(),
            published_at,
            title: titles
                .as_ref()
                .filter(|t| !t.is_null(row))
                .map(|t| t.value(row).to_string()),
            transcript: None,
        });
    }
    Ok(videos)
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    let Some(column) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let column = cast(column, &DataType::Utf8)?;
    Ok(column.as_any().downcast_ref::<StringArray>().cloned())
}
