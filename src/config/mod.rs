//! Configuration management.
//!
//! Settings come from built-in defaults, an optional TOML file and environment
//! variables prefixed `ARXIV_DIGEST_` (nested keys separated by `__`), in
//! increasing order of precedence.
//!
//! ```toml
//! [search]
//! endpoint = "http://export.arxiv.org/api/query"
//! timeout_secs = 30
//! max_results_limit = 2000
//! max_attempts = 1
//!
//! [enrichment]
//! concurrency = 4
//! entry_timeout_secs = 120
//! target_language = "zh"
//!
//! [transform]
//! base_url = "http://localhost:11434/v1"
//! model = "qwen2.5:7b"
//!
//! [export]
//! directory = "."
//! format = "csv"
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::{ExportFormat, FileExporter};
use crate::sources::ARXIV_API_URL;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "arxiv-digest.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Larger requests are clamped to this value
    #[serde(default = "default_max_results_limit")]
    pub max_results_limit: usize,

    /// Attempts per search; values above 1 retry transient failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_search_timeout(),
            max_results_limit: default_max_results_limit(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_endpoint() -> String {
    ARXIV_API_URL.to_string()
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_results_limit() -> usize {
    2000
}

fn default_max_attempts() -> u32 {
    1
}

/// Enrichment scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Entries processed simultaneously
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Transform calls in flight at once; defaults to `concurrency`
    #[serde(default)]
    pub engine_capacity: Option<usize>,

    /// Deadline for one entry's transforms, in seconds
    #[serde(default = "default_entry_timeout")]
    pub entry_timeout_secs: u64,

    #[serde(default = "default_target_language")]
    pub target_language: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            engine_capacity: None,
            entry_timeout_secs: default_entry_timeout(),
            target_language: default_target_language(),
        }
    }
}

fn default_concurrency() -> usize {
    crate::enrich::DEFAULT_CONCURRENCY
}

fn default_entry_timeout() -> u64 {
    120
}

fn default_target_language() -> String {
    "zh".to_string()
}

/// Chat-completions engine settings
#[derive(Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to `ARXIV_DIGEST_API_KEY`, then `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_summary_max_words")]
    pub summary_max_words: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            summary_max_words: default_summary_max_words(),
        }
    }
}

impl std::fmt::Debug for TransformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("summary_max_words", &self.summary_max_words)
            .finish()
    }
}

impl TransformConfig {
    /// API key from the file, or from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ARXIV_DIGEST_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_summary_max_words() -> usize {
    120
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub directory: PathBuf,

    #[serde(default)]
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_dir(),
            format: ExportFormat::default(),
        }
    }
}

impl ExportConfig {
    /// The exporter these settings describe, or `None` when exporting is off
    pub fn exporter(&self) -> Option<FileExporter> {
        (self.format != ExportFormat::None)
            .then(|| FileExporter::new(self.directory.clone(), self.format))
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// A configuration value outside its allowed range
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid configuration: {0}")]
pub struct InvalidConfig(pub String);

impl Config {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.enrichment.concurrency == 0 {
            return Err(InvalidConfig("enrichment.concurrency must be at least 1".to_string()));
        }
        if self.enrichment.engine_capacity == Some(0) {
            return Err(InvalidConfig(
                "enrichment.engine_capacity must be at least 1".to_string(),
            ));
        }
        if self.enrichment.entry_timeout_secs == 0 {
            return Err(InvalidConfig(
                "enrichment.entry_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.search.max_attempts == 0 {
            return Err(InvalidConfig("search.max_attempts must be at least 1".to_string()));
        }
        if self.search.max_results_limit == 0 {
            return Err(InvalidConfig(
                "search.max_results_limit must be at least 1".to_string(),
            ));
        }
        match url::Url::parse(&self.search.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(InvalidConfig(format!(
                "search.endpoint has unsupported scheme: {}",
                url.scheme()
            ))),
            Err(e) => Err(InvalidConfig(format!("search.endpoint: {}", e))),
        }
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }

    pub fn entry_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment.entry_timeout_secs)
    }

    /// Render as TOML, e.g. for writing a starter config file
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("ARXIV_DIGEST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Locate a config file: `./arxiv-digest.toml`, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("arxiv-digest").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Default location for `init-config`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("arxiv-digest").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
}
