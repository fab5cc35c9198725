//! Application configuration model and defaults.

use std::path::PathBuf;

/// Hard ceiling on download attempts per image, whatever the config says.
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Filesystem roots.
    pub application: ApplicationConfig,
    #[serde(default)]
    /// Remote image download behavior.
    pub fetch: FetchConfig,
    #[serde(default)]
    /// Bulk artwork validation.
    pub validator: ValidatorConfig,
    #[serde(default)]
    /// Cover-art embedding into media files.
    pub embedder: EmbedderConfig,
    #[serde(default)]
    /// Local index database.
    pub index: IndexConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Directories the artwork cache and media library live in.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApplicationConfig {
    /// Root of the artwork cache (`videos/`, `channels/`, `playlists/`).
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Application root holding `static/img/` fallback images.
    #[serde(default = "default_app_root")]
    pub app_root: PathBuf,
    /// Root the manifest's relative media paths are resolved against.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FetchConfig {
    /// Timeout for a single HTTP attempt.
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts, including the first one.
    #[serde(default = "default_fetch_max_attempts")]
    pub max_attempts: u32,
    /// Base unit for the retry backoff curve.
    #[serde(default = "default_fetch_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Outbound request cap, 0 disables throttling.
    #[serde(default)]
    pub max_requests_per_second: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_video_page_size")]
    pub video_page_size: usize,
    /// Page size for channel and playlist scans.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EmbedderConfig {
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    /// Stop the whole batch at the first entry whose thumbnail is missing.
    #[serde(default)]
    pub abort_on_missing_thumbnail: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LoggingConfig {
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/cache")
}

fn default_app_root() -> PathBuf {
    PathBuf::from("/app")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("/youtube")
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_fetch_max_attempts() -> u32 {
    MAX_FETCH_ATTEMPTS
}

fn default_fetch_backoff_unit_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    format!("archive-artwork/{}", env!("CARGO_PKG_VERSION"))
}

fn default_video_page_size() -> usize {
    5000
}

fn default_page_size() -> usize {
    500
}

fn default_progress_interval() -> usize {
    50
}

fn default_database_path() -> PathBuf {
    PathBuf::from("/cache/index.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            app_root: default_app_root(),
            media_dir: default_media_dir(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_attempts: default_fetch_max_attempts(),
            backoff_unit_ms: default_fetch_backoff_unit_ms(),
            max_requests_per_second: 0,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            video_page_size: default_video_page_size(),
            page_size: default_page_size(),
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            abort_on_missing_thumbnail: false,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level
            .trim()
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}

/// Clamps values that would stall or disable the pipelines.
pub fn sanitize_config(mut config: Config) -> Config {
    config.fetch.timeout_secs = config.fetch.timeout_secs.max(1);
    config.fetch.max_attempts = config.fetch.max_attempts.clamp(1, MAX_FETCH_ATTEMPTS);
    config.validator.video_page_size = config.validator.video_page_size.max(1);
    config.validator.page_size = config.validator.page_size.max(1);
    config.embedder.progress_interval = config.embedder.progress_interval.max(1);
    if config.fetch.user_agent.trim().is_empty() {
        config.fetch.user_agent = default_user_agent();
    }
    config
}
