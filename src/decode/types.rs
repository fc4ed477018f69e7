//! Decoder types and traits

use super::decoders::{CsvDecoder, JsonDecoder};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format of the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// CSV format with a header row
    Csv,
}

impl DecoderFormat {
    /// Guess the format from a `Content-Type` header or a file/URL suffix
    pub fn detect(hint: &str) -> Self {
        let hint = hint.to_ascii_lowercase();
        if hint.contains("text/csv") || hint.ends_with(".csv") || hint.contains("format=csv") {
            Self::Csv
        } else {
            Self::Json
        }
    }

    /// Build the default decoder for this format
    pub fn decoder(self, record_path: Option<&str>) -> Box<dyn RecordDecoder> {
        match self {
            Self::Json => match record_path {
                Some(path) => Box::new(JsonDecoder::with_path(path)),
                None => Box::new(JsonDecoder::new()),
            },
            Self::Csv => Box::new(CsvDecoder::new()),
        }
    }
}

/// Trait for decoding response bodies into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the response body into a list of records
    fn decode(&self, body: &str) -> Result<Vec<Value>>;

    /// Decode the response body into a single JSON value (full response)
    fn decode_raw(&self, body: &str) -> Result<Value>;
}
