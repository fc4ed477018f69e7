// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # datapull
//!
//! Small ingestion pipelines over public APIs, each writing timestamped
//! Parquet or CSV files that can later be combined and uploaded.
//!
//! ## Pipelines
//!
//! - **Videos**: a channel's recent uploads from the YouTube search API
//! - **Transcripts**: cleaned timed-text transcripts for the latest video list
//! - **Weather**: one OpenWeather observation per run, combined into one file
//! - **Open data**: a CKAN datastore resource as CSV
//! - **Analytics**: a zipped weekly report, flattened across folders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datapull::config::PipelineConfig;
//! use datapull::http::HttpClient;
//! use datapull::output::FileSink;
//! use datapull::pipeline::WeatherPipeline;
//!
//! #[tokio::main]
//! async fn main() -> datapull::Result<()> {
//!     let config = PipelineConfig::load(None)?;
//!     let client = HttpClient::with_config(config.http.client_config())?;
//!     let sink = FileSink::new(config.dataset_dir("open_weather_data"), config.weather.format)?;
//!
//!     let api_key = config.credentials.open_weather()?;
//!     let pipeline = WeatherPipeline::new(&client, &config.weather, api_key);
//!     pipeline.run(&sink).await?;
//!     pipeline.combine(sink.dir(), true)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Pipelines                            │
//! │   videos   transcripts   weather   open-data   analytics      │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬────────────┐
//! │  HTTP    │  Cache    │   Extract     │  Output   │ Warehouse  │
//! ├──────────┼───────────┼───────────────┼───────────┼────────────┤
//! │ Retry    │ TTL       │ Videos        │ Sink      │ Validate   │
//! │ Rate     │ Timeout   │ Weather       │ Combine   │ Partition  │
//! │ Limit    │           │ Transcripts   │ Parquet   │ Object     │
//! │ Paginate │           │ CSV / JSON    │ CSV       │ store      │
//! └──────────┴───────────┴───────────────┴───────────┴────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Retry policy shared by the fetcher and the uploader
pub mod retry;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Response decoders (JSON, CSV)
pub mod decode;

/// TTL cache for downloaded resources
pub mod cache;

/// Typed records from API responses
pub mod extract;

/// Arrow conversion, file sink and Parquet/CSV files
pub mod output;

/// Merging sink files
pub mod combine;

/// Validated uploads to an object store
pub mod warehouse;

/// Pipeline configuration
pub mod config;

/// Source pipelines
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorClass, Result};
pub use types::*;

pub use combine::{CombineOptions, CombineOutcome, Combiner};
pub use config::PipelineConfig;
pub use output::FileSink;
pub use warehouse::{ObjectStoreUploader, Uploader};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
