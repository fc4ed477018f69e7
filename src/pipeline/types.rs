//! Pipeline run types

use std::path::PathBuf;
use std::time::Instant;

/// Statistics from one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records written
    pub records: usize,
    /// Pages or documents fetched
    pub pages: usize,
    /// Per-item failures that did not abort the run
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_records(&mut self, count: usize) {
        self.records += count;
    }

    pub fn add_page(&mut self) {
        self.pages += 1;
    }

    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    pub fn finish(&mut self, start: Instant) {
        self.duration_ms = start.elapsed().as_millis() as u64;
    }
}

/// What a pipeline produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Pipeline name, for logs
    pub pipeline: &'static str,
    /// Sink file written, if any rows were produced
    pub output: Option<PathBuf>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            output: None,
            stats: RunStats::new(),
        }
    }
}
