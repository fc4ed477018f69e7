//! Pipeline configuration
//!
//! Everything is optional: a missing YAML file or a missing section falls
//! back to the defaults below, which reproduce the stock pipelines (the
//! Odenton weather station, the default YouTube channel and the Toronto open
//! data portal). API keys never live in the file; they are read from the
//! process environment once, when the config is loaded.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::retry::RetryPolicy;
use crate::types::{BackoffType, FileFormat, WriteMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the YouTube Data API key
pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Environment variable holding the OpenWeather API key
pub const OPEN_WEATHER_API_KEY_ENV: &str = "OPEN_WEATHER_API_KEY";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete configuration for all pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for sink and combined files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP client settings shared by every pipeline
    #[serde(default)]
    pub http: HttpConfig,

    /// Video metadata and transcripts
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Current weather observations
    #[serde(default)]
    pub weather: WeatherConfig,

    /// CKAN datastore CSV dumps
    #[serde(default)]
    pub open_data: OpenDataConfig,

    /// Zipped web analytics reports
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Upload target
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// API keys from the environment
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            http: HttpConfig::default(),
            youtube: YouTubeConfig::default(),
            weather: WeatherConfig::default(),
            open_data: OpenDataConfig::default(),
            analytics: AnalyticsConfig::default(),
            warehouse: WarehouseConfig::default(),
            credentials: Credentials::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl PipelineConfig {
    /// Load from an optional YAML file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Self::from_yaml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.credentials = Credentials::from_env();
        Ok(config)
    }

    /// Parse and validate YAML; credentials are left empty
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no pipeline can run with
    pub fn validate(&self) -> Result<()> {
        if self.youtube.lookback_days == 0 {
            return Err(invalid("youtube.lookback_days", "must be at least 1"));
        }
        if self.youtube.max_results == 0 || self.youtube.max_results > 50 {
            return Err(invalid("youtube.max_results", "must be between 1 and 50"));
        }
        if self.youtube.max_concurrency == 0 {
            return Err(invalid("youtube.max_concurrency", "must be at least 1"));
        }
        if !self.youtube.transcript_url.contains("{video_id}") {
            return Err(invalid(
                "youtube.transcript_url",
                "must contain the {video_id} placeholder",
            ));
        }
        if self.analytics.max_folders == 0 {
            return Err(invalid("analytics.max_folders", "must be at least 1"));
        }
        if self.http.rate_limit.requests_per_second == 0 {
            return Err(invalid("http.rate_limit.requests_per_second", "must be at least 1"));
        }
        Ok(())
    }

    /// Directory for one dataset's files
    pub fn dataset_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

fn invalid(field: &str, message: &str) -> Error {
    Error::InvalidConfigValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// API keys read from the environment
#[derive(Clone, Default)]
pub struct Credentials {
    /// YouTube Data API key
    pub youtube_api_key: Option<String>,
    /// OpenWeather API key
    pub open_weather_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("youtube_api_key", &mask(&self.youtube_api_key))
            .field("open_weather_api_key", &mask(&self.open_weather_api_key))
            .finish()
    }
}

impl Credentials {
    /// Read every key from the process environment; empty values count as unset
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            youtube_api_key: read(YOUTUBE_API_KEY_ENV),
            open_weather_api_key: read(OPEN_WEATHER_API_KEY_ENV),
        }
    }

    /// YouTube key, or `MissingConfigField`
    pub fn youtube(&self) -> Result<&str> {
        self.youtube_api_key
            .as_deref()
            .ok_or_else(|| Error::missing_field(YOUTUBE_API_KEY_ENV))
    }

    /// OpenWeather key, or `MissingConfigField`
    pub fn open_weather(&self) -> Result<&str> {
        self.open_weather_api_key
            .as_deref()
            .ok_or_else(|| Error::missing_field(OPEN_WEATHER_API_KEY_ENV))
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl HttpConfig {
    /// Retry policy for fetches and uploads
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.retry_backoff.initial_ms),
            max_backoff: Duration::from_millis(self.retry_backoff.max_ms),
            backoff_type: self.retry_backoff.backoff_type,
        }
    }

    /// Client settings
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .retry(self.retry_policy())
            .rate_limit(RateLimiterConfig::new(
                self.rate_limit.requests_per_second,
                self.rate_limit.burst_size,
            ))
            .build()
    }
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    30_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Requests allowed back to back
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

fn default_rps() -> u32 {
    5
}

fn default_burst() -> u32 {
    5
}

// ============================================================================
// Source Configs
// ============================================================================

/// YouTube search and transcript settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Search endpoint
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Channel whose uploads are listed
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// Only videos published within this many days are kept
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Page size, at most 50
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Stop after this many pages
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Timed-text URL; `{video_id}` is replaced per video
    #[serde(default = "default_transcript_url")]
    pub transcript_url: String,

    /// Transcript fetches in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-transcript timeout in seconds
    #[serde(default = "default_transcript_timeout")]
    pub transcript_timeout_seconds: u64,

    /// Output format of both datasets
    #[serde(default)]
    pub format: FileFormat,

    /// File prefix of the video list
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,

    /// File prefix of the transcript dataset
    #[serde(default = "default_transcript_prefix")]
    pub transcript_prefix: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            channel_id: default_channel_id(),
            lookback_days: default_lookback_days(),
            max_results: default_max_results(),
            max_pages: None,
            transcript_url: default_transcript_url(),
            max_concurrency: default_max_concurrency(),
            transcript_timeout_seconds: default_transcript_timeout(),
            format: FileFormat::Parquet,
            video_prefix: default_video_prefix(),
            transcript_prefix: default_transcript_prefix(),
        }
    }
}

fn default_search_url() -> String {
    "https://www.googleapis.com/youtube/v3/search".to_string()
}

fn default_channel_id() -> String {
    "UCBTy8j2cPy6zw68godcE7MQ".to_string()
}

fn default_lookback_days() -> u32 {
    15
}

fn default_max_results() -> u32 {
    50
}

fn default_transcript_url() -> String {
    "https://video.google.com/timedtext?lang=en&v={video_id}".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_transcript_timeout() -> u64 {
    30
}

fn default_video_prefix() -> String {
    "video_ids".to_string()
}

fn default_transcript_prefix() -> String {
    "video_transcripts".to_string()
}

/// OpenWeather current-conditions settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Current weather endpoint
    #[serde(default = "default_weather_url")]
    pub url: String,

    #[serde(default = "default_city")]
    pub city: String,

    #[serde(default = "default_state")]
    pub state: String,

    #[serde(default = "default_country")]
    pub country: String,

    /// Dataset directory under `data_dir`, also the file prefix
    #[serde(default = "default_weather_prefix")]
    pub prefix: String,

    #[serde(default = "default_csv")]
    pub format: FileFormat,

    /// Column the combined file is sorted by
    #[serde(default = "default_weather_sort")]
    pub sort_column: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            url: default_weather_url(),
            city: default_city(),
            state: default_state(),
            country: default_country(),
            prefix: default_weather_prefix(),
            format: default_csv(),
            sort_column: default_weather_sort(),
        }
    }
}

impl WeatherConfig {
    /// `q` parameter, `{city},{state},{country}`
    pub fn location(&self) -> String {
        [&self.city, &self.state, &self.country]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_city() -> String {
    "Odenton".to_string()
}

fn default_state() -> String {
    "MD".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

fn default_weather_prefix() -> String {
    "open_weather_data".to_string()
}

fn default_csv() -> FileFormat {
    FileFormat::Csv
}

fn default_weather_sort() -> String {
    "request_datetime".to_string()
}

/// CKAN datastore dump settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDataConfig {
    /// CKAN portal root
    #[serde(default = "default_ckan_url")]
    pub base_url: String,

    /// Package holding the resource
    #[serde(default = "default_open_data_package")]
    pub package_id: String,

    /// Resource name; the first datastore-active resource when unset
    #[serde(default)]
    pub resource_name: Option<String>,

    #[serde(default = "default_open_data_prefix")]
    pub prefix: String,

    #[serde(default = "default_csv")]
    pub format: FileFormat,
}

impl Default for OpenDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_ckan_url(),
            package_id: default_open_data_package(),
            resource_name: None,
            prefix: default_open_data_prefix(),
            format: default_csv(),
        }
    }
}

fn default_ckan_url() -> String {
    "https://ckan0.cf.opendata.inter.prod-toronto.ca".to_string()
}

fn default_open_data_package() -> String {
    "daily-shelter-overnight-service-occupancy-capacity".to_string()
}

fn default_open_data_prefix() -> String {
    "open_data".to_string()
}

/// Web analytics zip settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// CKAN portal root
    #[serde(default = "default_ckan_url")]
    pub base_url: String,

    #[serde(default = "default_analytics_package")]
    pub package_id: String,

    /// Name of the non-datastore resource pointing at the zip
    #[serde(default = "default_analytics_resource")]
    pub resource_name: String,

    /// File read from each report folder
    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,

    /// Report folders read, in sorted order
    #[serde(default = "default_max_folders")]
    pub max_folders: usize,

    /// How long a downloaded zip stays fresh, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_seconds: u64,

    #[serde(default = "default_analytics_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub format: FileFormat,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: default_ckan_url(),
            package_id: default_analytics_package(),
            resource_name: default_analytics_resource(),
            metrics_file: default_metrics_file(),
            max_folders: default_max_folders(),
            cache_ttl_seconds: default_cache_ttl(),
            download_timeout_seconds: default_download_timeout(),
            prefix: default_analytics_prefix(),
            format: FileFormat::Parquet,
        }
    }
}

fn default_analytics_package() -> String {
    "web-analytics".to_string()
}

fn default_analytics_resource() -> String {
    "web-analytics-weekly-report".to_string()
}

fn default_metrics_file() -> String {
    "Key Metrics.csv".to_string()
}

fn default_max_folders() -> usize {
    5
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_download_timeout() -> u64 {
    300
}

fn default_analytics_prefix() -> String {
    "web_analytics".to_string()
}

/// Warehouse upload settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Object store URL (`s3://`, `r2://`, `gs://`, `az://` or a local path)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub mode: WriteMode,

    #[serde(default)]
    pub partition_column: Option<String>,

    /// YAML table schema checked before upload
    #[serde(default)]
    pub schema_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = PipelineConfig::from_yaml("{}").unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.youtube.channel_id, "UCBTy8j2cPy6zw68godcE7MQ");
        assert_eq!(config.youtube.lookback_days, 15);
        assert_eq!(config.youtube.max_concurrency, 4);
        assert_eq!(config.weather.location(), "Odenton,MD,US");
        assert_eq!(config.weather.format, FileFormat::Csv);
        assert_eq!(config.analytics.max_folders, 5);
        assert_eq!(config.analytics.cache_ttl_seconds, 3600);
        assert_eq!(config.warehouse.mode, WriteMode::Append);
        assert!(config.credentials.youtube_api_key.is_none());
    }

    #[test]
    fn test_partial_override() {
        let yaml = r"
data_dir: /tmp/pulls
http:
  max_retries: 1
  retry_backoff:
    type: linear
    initial_ms: 10
youtube:
  lookback_days: 30
  format: csv
weather:
  city: Laurel
warehouse:
  url: s3://bucket/raw
  mode: overwrite
";
        let config = PipelineConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/pulls"));
        assert_eq!(config.youtube.lookback_days, 30);
        assert_eq!(config.youtube.format, FileFormat::Csv);
        assert_eq!(config.youtube.max_results, 50);
        assert_eq!(config.weather.location(), "Laurel,MD,US");
        assert_eq!(config.warehouse.mode, WriteMode::Overwrite);

        let policy = config.http.retry_policy();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.backoff_type, BackoffType::Linear);
        assert_eq!(policy.initial_backoff, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for yaml in [
            "youtube:\n  lookback_days: 0\n",
            "youtube:\n  max_results: 51\n",
            "youtube:\n  max_concurrency: 0\n",
            "youtube:\n  transcript_url: https://example.com/captions\n",
            "analytics:\n  max_folders: 0\n",
        ] {
            let err = PipelineConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, Error::InvalidConfigValue { .. }), "{yaml}");
        }
    }

    #[test]
    fn test_bad_yaml() {
        let err = PipelineConfig::from_yaml("youtube: [1, 2").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = PipelineConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_missing_credentials() {
        let creds = Credentials::default();
        assert!(matches!(
            creds.youtube(),
            Err(Error::MissingConfigField { ref field }) if field == "YOUTUBE_API_KEY"
        ));
        assert!(matches!(
            creds.open_weather(),
            Err(Error::MissingConfigField { ref field }) if field == "OPEN_WEATHER_API_KEY"
        ));

        let creds = Credentials {
            youtube_api_key: Some("yt".to_string()),
            open_weather_api_key: None,
        };
        assert_eq!(creds.youtube().unwrap(), "yt");
        assert!(!format!("{creds:?}").contains("yt"));
    }
}
