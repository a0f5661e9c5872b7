//! Configuration file parser for ~/.config/folio/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which carries the built-in feed list. Unknown keys are ignored by serde,
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::aggregate::FeedSource;
use crate::article::DEFAULT_SITE_LABEL;
use crate::feed::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_BYTES};
use crate::util::validate_url;

/// Feeds aggregated when the config file does not list any.
pub const DEFAULT_FEEDS: &[&str] = &[
    // Tech
    "https://techcrunch.com/feed/",
    "https://hnrss.org/frontpage",
    "https://www.theverge.com/rss/index.xml",
    "https://feeds.arstechnica.com/arstechnica/index",
    "https://www.wired.com/feed/rss",
    // News and culture
    "https://feeds.bbci.co.uk/news/rss.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
    "https://www.theatlantic.com/feed/all/",
    "https://www.newyorker.com/feed/everything",
    "http://feeds.feedburner.com/nymag/intelligencer",
    // Fashion
    "http://feeds.feedburner.com/nymag/fashion",
];

const KNOWN_KEYS: &[&str] = &[
    "site_label",
    "feeds",
    "fetch_timeout_secs",
    "max_concurrent_fetches",
    "max_feed_bytes",
    "database_path",
    "image_dir",
    "image_base_url",
];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publication name shown on book posts in the homepage feed.
    pub site_label: String,

    /// Feed URLs, aggregated in this order.
    pub feeds: Vec<String>,

    /// Per-feed request timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Feeds fetched at once. 1 fetches them one after another.
    pub max_concurrent_fetches: usize,

    /// Largest accepted feed body in bytes.
    pub max_feed_bytes: usize,

    /// SQLite file. Defaults to `folio.db` in the config directory.
    pub database_path: Option<PathBuf>,

    /// Directory for uploaded cover images. Defaults to `images/` in the
    /// config directory.
    pub image_dir: Option<PathBuf>,

    /// URL prefix under which `image_dir` is served.
    pub image_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_label: DEFAULT_SITE_LABEL.to_string(),
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_concurrent_fetches: 4,
            max_feed_bytes: DEFAULT_MAX_FEED_BYTES,
            database_path: None,
            image_dir: None,
            image_base_url: "/uploads".to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Validated feed sources in configuration order.
    ///
    /// Entries that fail URL validation are logged and skipped so one typo
    /// does not take down the homepage.
    pub fn feed_sources(&self) -> Vec<FeedSource> {
        self.feeds
            .iter()
            .filter_map(|raw| match validate_url(raw) {
                Ok(url) => Some(FeedSource::new(url.as_str())),
                Err(e) => {
                    tracing::warn!(feed = %raw, error = %e, "Skipping invalid feed URL");
                    None
                }
            })
            .collect()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Database file, resolved against the config directory when unset.
    pub fn database_path(&self, config_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| config_dir.join("folio.db"))
    }

    /// Image directory, resolved against the config directory when unset.
    pub fn image_dir(&self, config_dir: &Path) -> PathBuf {
        self.image_dir
            .clone()
            .unwrap_or_else(|| config_dir.join("images"))
    }
}

// ============================================================================
// Tests
// ============================================================================
