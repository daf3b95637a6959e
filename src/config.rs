//! Configuration file parser for the feedwatch TOML config.
//!
//! Unlike most optional app config, the feed list is the whole reason the
//! process exists: a missing or empty config is a hard error, not a default.
//! Secrets (webhook URL, OpenAI key) may come from the config file but the
//! corresponding environment variables take precedence.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding `webhook_url`.
pub const WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";
/// Environment variable overriding `openai_api_key`.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// No feed sources configured; there is nothing to poll.
    #[error("No feeds configured in {0}")]
    NoFeeds(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// One externally configured syndication source.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSource {
    /// Display name used in notifications and as the author fallback.
    pub name: String,
    /// Feed URL; also the identity the watermark is keyed by.
    pub url: String,
    /// Embed color for this source. Falls back to `default_color`.
    pub color: Option<u32>,
}

/// Top-level application configuration.
///
/// All fields except `feeds` use `#[serde(default)]` so any subset of keys
/// can be specified. The custom `Debug` impl masks both secrets to prevent
/// leakage in logs, error messages, and debug output.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Feed sources to poll. Required, must be non-empty.
    pub feeds: Vec<FeedSource>,

    /// Embed color used when a source has none configured.
    #[serde(default = "default_color")]
    pub default_color: u32,

    /// SQLite database path for watermark state.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Minutes between scheduled runs in serve mode. Default is daily.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Whether to rewrite item descriptions through the summarizer.
    /// Requires an OpenAI API key; without one the original text is kept.
    #[serde(default)]
    pub summarize: bool,

    /// Discord-style webhook URL (alternative to DISCORD_WEBHOOK_URL).
    /// Env var takes precedence over config file.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// OpenAI API key (alternative to OPENAI_API_KEY env var).
    /// Env var takes precedence over config file.
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

fn default_color() -> u32 {
    5814783 // #58BBFF
}

fn default_database_path() -> String {
    "feedwatch.db".to_string()
}

fn default_interval_minutes() -> u64 {
    1440
}

/// Mask webhook URL and API key in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feeds", &self.feeds)
            .field("default_color", &self.default_color)
            .field("database_path", &self.database_path)
            .field("interval_minutes", &self.interval_minutes)
            .field("summarize", &self.summarize)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "[REDACTED]"))
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)` (the feed list is required)
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Empty feed list → `Err(ConfigError::NoFeeds)`
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion from a
        // corrupted or maliciously large config file.
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feeds",
                "default_color",
                "database_path",
                "interval_minutes",
                "summarize",
                "webhook_url",
                "openai_api_key",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        if config.feeds.is_empty() {
            return Err(ConfigError::NoFeeds(path.display().to_string()));
        }

        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Resolve the webhook URL: environment variable first, then config.
    /// `None` means dispatch degrades to a logged no-op.
    pub fn webhook_url(&self) -> Option<SecretString> {
        std::env::var(WEBHOOK_URL_ENV)
            .ok()
            .or_else(|| self.webhook_url.clone())
            .map(SecretString::from)
    }

    /// Resolve the OpenAI API key: environment variable first, then config.
    pub fn openai_api_key(&self) -> Option<SecretString> {
        std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .or_else(|| self.openai_api_key.clone())
            .map(SecretString::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
