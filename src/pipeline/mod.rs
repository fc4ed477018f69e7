//! Pipelines
//!
//! Each pipeline fetches from one external API, extracts records and writes
//! them through a [`FileSink`](crate::output::FileSink):
//! - [`VideoPipeline`] and [`TranscriptPipeline`] for YouTube uploads
//! - [`WeatherPipeline`] for OpenWeather current conditions
//! - [`OpenDataPipeline`] for CKAN datastore dumps
//! - [`AnalyticsPipeline`] for the zipped web analytics report

mod analytics;
mod ckan;
mod open_data;
mod types;
mod weather;
mod youtube;

pub use analytics::{
    combine_report_metrics, report_folders, AnalyticsPipeline, SOURCE_FOLDER_COLUMN,
};
pub use ckan::{CkanClient, CkanResource};
pub use open_data::OpenDataPipeline;
pub use types::{RunReport, RunStats};
pub use weather::WeatherPipeline;
pub use youtube::{
    fetch_transcripts, video_records_from_batch, TimedTextSource, TranscriptPipeline,
    TranscriptSource, VideoPipeline,
};
