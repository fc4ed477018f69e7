//! Combine previously sunk files into one derived file per prefix
//!
//! The combined file (`{prefix}_combined.{ext}`) is rebuilt from every
//! readable sink file on each run; unreadable or empty files are skipped
//! with a warning.

mod combiner;

pub use combiner::{CombineOptions, CombineOutcome, Combiner};

#[cfg(test)]
mod tests;
