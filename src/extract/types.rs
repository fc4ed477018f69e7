//! Record types produced by the extractors

use crate::error::Result;
use crate::output::{json_to_arrow, timestamp_type};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flat record with a fixed Arrow schema
pub trait Record: Serialize {
    /// Arrow schema every batch of this record type uses
    fn schema() -> Schema;
}

/// Convert typed records into a batch with the record's schema
///
/// Row order follows slice order.
pub fn records_to_batch<R: Record>(records: &[R]) -> Result<RecordBatch> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    json_to_arrow(&values, Some(&R::schema()))
}

/// One video from a channel search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub published_at: DateTime<Utc>,
    pub title: Option<String>,
    /// Cleaned transcript text, filled in by the transcripts pipeline
    pub transcript: Option<String>,
}

impl Record for VideoRecord {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("video_id", DataType::Utf8, false),
            Field::new("published_at", timestamp_type(), false),
            Field::new("title", DataType::Utf8, true),
            Field::new("transcript", DataType::Utf8, true),
        ])
    }
}

/// Current conditions for one city, temperatures in Fahrenheit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Local request time, `%Y-%m-%d %H:%M:%S`
    pub request_datetime: String,
    pub city_name: String,
    pub city_id: i64,
    pub city_country: String,
    pub longitude: f64,
    pub latitude: f64,
    pub weather_description: String,
    pub temp_fahrenheit: f64,
    pub temp_min_fahrenheit: f64,
    pub temp_max_fahrenheit: f64,
    pub humidity: i64,
    pub wind_speed: f64,
}

impl Record for WeatherRecord {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("request_datetime", DataType::Utf8, false),
            Field::new("city_name", DataType::Utf8, false),
            Field::new("city_id", DataType::Int64, false),
            Field::new("city_country", DataType::Utf8, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("latitude", DataType::Float64, false),
            Field::new("weather_description", DataType::Utf8, false),
            Field::new("temp_fahrenheit", DataType::Float64, false),
            Field::new("temp_min_fahrenheit", DataType::Float64, false),
            Field::new("temp_max_fahrenheit", DataType::Float64, false),
            Field::new("humidity", DataType::Int64, false),
            Field::new("wind_speed", DataType::Float64, false),
        ])
    }
}
