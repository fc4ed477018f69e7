//! Record extraction
//!
//! Turns raw API responses into typed records and Arrow batches:
//! - YouTube search pages into [`VideoRecord`]s, filtered by lookback window and kind
//! - OpenWeather current conditions into one [`WeatherRecord`]
//! - Timed-text transcripts into cleaned plain text

mod transcript;
mod types;
mod video;
mod weather;

pub use transcript::{clean_transcript, parse_timed_text, NO_TRANSCRIPT, SPECIAL_STRINGS};
pub use types::{records_to_batch, Record, VideoRecord, WeatherRecord};
pub use video::{extract_video_page, extract_video_records, VideoFilter, YOUTUBE_VIDEO_KIND};
pub use weather::{extract_weather_record, kelvin_to_fahrenheit, REQUEST_DATETIME_FORMAT};
