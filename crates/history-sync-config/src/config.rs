use history_sync_models::SyncMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub douban: DoubanConfig,
    #[serde(default)]
    pub refine: RefineConfig,
    #[serde(default)]
    pub trakt: TraktConfig,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Source catalog account and interest-feed paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoubanConfig {
    #[serde(default)]
    pub user_id: String,
    /// Interest statuses to pull into the feed map
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Consecutive empty or failed pages that end one status
    #[serde(default = "default_max_empty_pages")]
    pub max_empty_pages: u32,
}

/// Deep per-subject time refinement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefineConfig {
    #[serde(default)]
    pub deep_refine: bool,
    /// Only deep-refine records whose page date is within this many days
    #[serde(default)]
    pub window_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraktConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub mode: SyncMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Delays between successive remote calls, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_feed_page_delay_ms")]
    pub feed_page_delay_ms: u64,
}

pub const DEFAULT_BATCH_SIZE: usize = 80;

/// Consecutive-miss threshold used when pulling every interest status.
pub const ALL_STATUSES_MAX_EMPTY_PAGES: u32 = 3;

pub fn all_statuses() -> Vec<String> {
    ["done", "do", "mark", "wish"].iter().map(|s| s.to_string()).collect()
}

fn default_statuses() -> Vec<String> {
    vec!["done".to_string()]
}

fn default_page_size() -> u32 {
    100
}

fn default_max_empty_pages() -> u32 {
    1
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36".to_string()
}

fn default_request_delay_ms() -> u64 {
    600
}

fn default_batch_delay_ms() -> u64 {
    1200
}

fn default_feed_page_delay_ms() -> u64 {
    200
}

impl Default for DoubanConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            statuses: default_statuses(),
            page_size: default_page_size(),
            max_empty_pages: default_max_empty_pages(),
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            mode: SyncMode::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            feed_page_delay_ms: default_feed_page_delay_ms(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.batch_size == 0 {
            return Err(ConfigError::Invalid("sync.batch_size must be at least 1".to_string()));
        }
        if self.douban.page_size == 0 {
            return Err(ConfigError::Invalid("douban.page_size must be at least 1".to_string()));
        }
        if self.douban.max_empty_pages == 0 {
            return Err(ConfigError::Invalid("douban.max_empty_pages must be at least 1".to_string()));
        }
        if self.douban.statuses.is_empty() {
            return Err(ConfigError::Invalid("douban.statuses cannot be empty".to_string()));
        }
        if let Some(days) = self.refine.window_days {
            if days < 0 {
                return Err(ConfigError::Invalid("refine.window_days must be non-negative".to_string()));
            }
        }
        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        !self.trakt.client_id.is_empty() && self.trakt.client_id != "YOUR_CLIENT_ID"
    }

    /// Switch the feed settings to the broader every-status variant.
    pub fn use_all_statuses(&mut self) {
        self.douban.statuses = all_statuses();
        self.douban.max_empty_pages = ALL_STATUSES_MAX_EMPTY_PAGES;
    }
}
