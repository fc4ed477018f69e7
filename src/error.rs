//! Error types for datapull
//!
//! Every fallible API in the crate returns `Result<T, Error>`. Each variant
//! belongs to exactly one [`ErrorClass`], and the class decides the policy:
//! network errors are retried by the fetcher and uploader, schema errors are
//! raised before any upload request, file-system errors are fatal.

use thiserror::Error;

/// The main error type for datapull
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Network Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Parse Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("CSV parsing error: {message}")]
    CsvParse { message: String },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // Schema Errors
    // ============================================================================
    #[error("Missing column '{column}'")]
    MissingColumn { column: String },

    #[error("Column '{column}' should be {expected}, found {found}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Column '{column}' is required but contains {nulls} null value(s)")]
    NullInRequiredColumn { column: String, nulls: usize },

    // ============================================================================
    // File System Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad or missing configuration
    Config,
    /// Unreachable host, non-2xx status, timeout, object store failure
    Network,
    /// Malformed JSON, CSV, archive or columnar data
    Parse,
    /// Missing or mistyped column detected before upload
    Schema,
    /// Missing directory, unwritable path
    FileSystem,
    /// Anything else
    Other,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a CSV error
    pub fn csv(message: impl Into<String>) -> Self {
        Self::CsvParse {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Create a directory-not-found error
    pub fn directory_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::DirectoryNotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    /// Which class of failure this is
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::InvalidUrl(_) => ErrorClass::Config,

            Error::Http(_)
            | Error::HttpStatus { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::MaxRetriesExceeded { .. }
            | Error::ObjectStore(_) => ErrorClass::Network,

            Error::JsonParse(_)
            | Error::JsonPath { .. }
            | Error::Decode { .. }
            | Error::CsvParse { .. }
            | Error::Zip(_)
            | Error::Arrow(_)
            | Error::Parquet(_) => ErrorClass::Parse,

            Error::MissingColumn { .. }
            | Error::ColumnType { .. }
            | Error::NullInRequiredColumn { .. } => ErrorClass::Schema,

            Error::Io(_)
            | Error::DirectoryNotFound { .. }
            | Error::FileNotFound { .. }
            | Error::Output { .. } => ErrorClass::FileSystem,

            Error::TaskJoin(_) | Error::Other(_) => ErrorClass::Other,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::ObjectStore(e) => !matches!(
                e,
                object_store::Error::NotFound { .. }
                    | object_store::Error::AlreadyExists { .. }
                    | object_store::Error::InvalidPath { .. }
                    | object_store::Error::NotSupported { .. }
                    | object_store::Error::NotImplemented
            ),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for datapull
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("YOUTUBE_API_KEY");
        assert_eq!(
            err.to_string(),
            "Missing required config field: YOUTUBE_API_KEY"
        );

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::ColumnType {
            column: "age".to_string(),
            expected: "integer".to_string(),
            found: "Utf8".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'age' should be integer, found Utf8");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::missing_column("id").is_retryable());
    }

    #[test]
    fn test_error_class() {
        assert_eq!(Error::http_status(502, "").class(), ErrorClass::Network);
        assert_eq!(Error::decode("bad").class(), ErrorClass::Parse);
        assert_eq!(Error::csv("bad").class(), ErrorClass::Parse);
        assert_eq!(Error::missing_column("id").class(), ErrorClass::Schema);
        assert_eq!(
            Error::directory_not_found("/nope").class(),
            ErrorClass::FileSystem
        );
        assert_eq!(Error::missing_field("key").class(), ErrorClass::Config);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(Error::from(io).class(), ErrorClass::FileSystem);
    }

    #[test]
    fn test_directory_not_found_display() {
        let err = Error::directory_not_found("data/weather");
        assert_eq!(err.to_string(), "Directory not found: data/weather");
    }
}
