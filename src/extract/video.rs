//! YouTube search page extraction

use super::types::VideoRecord;
use crate::decode::{JsonDecoder, RecordDecoder};
use crate::error::Result;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// `id.kind` of search results that are videos (not channels or playlists)
pub const YOUTUBE_VIDEO_KIND: &str = "youtube#video";

const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Which search results become records
#[derive(Debug, Clone)]
pub struct VideoFilter {
    /// Keep items published at or after `now - lookback_days`
    pub lookback_days: u32,
    /// Reference instant for the lookback window
    pub now: DateTime<Utc>,
    /// Required `id.kind`
    pub kind: String,
}

impl VideoFilter {
    /// Videos from the last `lookback_days` days, relative to the current time
    pub fn new(lookback_days: u32) -> Self {
        Self {
            lookback_days,
            now: Utc::now(),
            kind: YOUTUBE_VIDEO_KIND.to_string(),
        }
    }

    /// Use a fixed reference instant
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Earliest publish time that passes the filter
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.lookback_days))
    }
}

/// Parse a raw search response body and extract its videos
///
/// A body that is not JSON is a [`Decode`](crate::Error::Decode) error.
pub fn extract_video_records(body: &str, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
    let value = JsonDecoder::new().decode_raw(body)?;
    extract_video_page(&value, filter)
}

/// Extract videos from an already parsed search page, in response order
///
/// Items without a parseable `snippet.publishedAt`, outside the lookback
/// window, of another kind, or without a video id are skipped.
pub fn extract_video_page(page: &Value, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
    let items = JsonDecoder::with_path("items").extract_records(page)?;
    let cutoff = filter.cutoff();

    let records: Vec<VideoRecord> = items
        .iter()
        .filter_map(|item| {
            let published = item.pointer("/snippet/publishedAt")?.as_str()?;
            let Ok(published_at) = NaiveDateTime::parse_from_str(published, PUBLISHED_AT_FORMAT)
            else {
                debug!("Skipping item with unparseable publishedAt '{}'", published);
                return None;
            };
            let published_at = published_at.and_utc();

            if published_at < cutoff {
                return None;
            }
            if item.pointer("/id/kind").and_then(Value::as_str) != Some(filter.kind.as_str()) {
                return None;
            }

            let Some(video_id) = item.pointer("/id/videoId").and_then(Value::as_str) else {
                debug!("Skipping {} item without videoId", filter.kind);
                return None;
            };

            Some(VideoRecord {
                video_id: video_id.to_string(),
                published_at,
                title: item
                    .pointer("/snippet/title")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                transcript: None,
            })
        })
        .collect();

    debug!("Kept {} of {} search items", records.len(), items.len());
    Ok(records)
}
