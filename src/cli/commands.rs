//! CLI commands and argument parsing

use crate::types::{FileFormat, WriteMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pull public API data into local files and a warehouse
#[derive(Parser, Debug)]
#[command(name = "datapull")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for output files, overrides `data_dir` from the config
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the channel's recent videos
    Videos {
        /// Also fetch transcripts for the new list
        #[arg(long)]
        transcripts: bool,

        /// Override the lookback window in days
        #[arg(long)]
        lookback_days: Option<u32>,
    },

    /// Fetch transcripts for the most recent video list
    Transcripts {
        /// Override the number of concurrent transcript requests
        #[arg(long)]
        max_concurrency: Option<usize>,
    },

    /// Record current weather, then combine all observations
    Weather {
        /// Only fetch, do not combine
        #[arg(long)]
        no_combine: bool,

        /// Keep an existing combined file
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Download the configured CKAN datastore resource
    OpenData {
        /// Override the CKAN package id
        #[arg(long)]
        package: Option<String>,

        /// Override the datastore resource name
        #[arg(long)]
        resource: Option<String>,
    },

    /// Download and flatten the web analytics report
    Analytics {
        /// Override the number of report folders read
        #[arg(long)]
        max_folders: Option<usize>,
    },

    /// Combine sink files of one prefix into a single file
    Combine {
        /// Directory holding the sink files
        #[arg(long)]
        dir: PathBuf,

        /// Logical name the sink files start with
        #[arg(long)]
        prefix: String,

        /// File format of inputs and output
        #[arg(long, default_value = "csv")]
        format: FormatArg,

        /// Sort by this column
        #[arg(long)]
        sort: Option<String>,

        /// Keep an existing combined file
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Upload a CSV or Parquet file to the warehouse
    Upload {
        /// File to upload
        path: PathBuf,

        /// Target table, dot separated (e.g. `raw.weather`)
        #[arg(long)]
        table: String,

        /// Write mode, defaults to the config's
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Partition objects by this column
        #[arg(long)]
        partition: Option<String>,

        /// YAML table schema checked before upload
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Object store URL, overrides `warehouse.url`
        #[arg(long)]
        url: Option<String>,
    },
}

/// File format argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for FileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => FileFormat::Csv,
            FormatArg::Parquet => FileFormat::Parquet,
        }
    }
}

/// Write mode argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Append,
    Overwrite,
}

impl From<ModeArg> for WriteMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Append => WriteMode::Append,
            ModeArg::Overwrite => WriteMode::Overwrite,
        }
    }
}
