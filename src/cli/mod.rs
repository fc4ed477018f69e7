//! CLI module
//!
//! Command-line interface for running the pipelines.
//!
//! # Commands
//!
//! - `videos` - List recent channel videos, optionally with transcripts
//! - `transcripts` - Transcribe the most recent video list
//! - `weather` - Record current weather and combine observations
//! - `open-data` - Download a CKAN datastore resource
//! - `analytics` - Flatten the web analytics report zip
//! - `combine` - Merge sink files of one prefix
//! - `upload` - Send a file to the warehouse

mod commands;
mod runner;

pub use commands::{Cli, Commands, FormatArg, ModeArg};
pub use runner::Runner;
