//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::extract::ExtractStrategy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Browser-like user agent; the publisher rejects default client strings
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Extra attempts for transient download failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each further attempt
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    1000
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

/// Listing page extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub strategy: ExtractStrategy,

    /// Global assigned in the page script, without the `window.` prefix
    #[serde(default = "default_state_global")]
    pub state_global: String,

    /// `name` of the state nodes that wrap a puzzle
    #[serde(default = "default_sentinel_name")]
    pub sentinel_name: String,
}

fn default_state_global() -> String {
    "__TIMES_STATE__".to_string()
}

fn default_sentinel_name() -> String {
    "Puzzle".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractStrategy::default(),
            state_global: default_state_global(),
            sentinel_name: default_sentinel_name(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub extract: ExtractConfig,
}

fn default_listing_url() -> String {
    "https://www.thetimes.com/puzzles/printable".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./puzzles")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./puzzleScraperDatabase.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            download_dir: default_download_dir(),
            state_file: default_state_file(),
            log_level: default_log_level(),
            fetch: FetchSettings::default(),
            extract: ExtractConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.listing_url).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Listing URL is not a valid URL: {}",
                self.listing_url
            )));
        }

        if self.fetch.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Fetch timeout must be greater than 0".to_string(),
            ));
        }

        if self.fetch.user_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "User agent must not be empty".to_string(),
            ));
        }

        if reqwest::header::HeaderValue::from_str(&self.fetch.user_agent).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "User agent is not a valid header value: {:?}",
                self.fetch.user_agent
            )));
        }

        if self.extract.state_global.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Embedded state global must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a human-friendly interval string (e.g., "1d", "6h", "30m", "90s").
///
/// A bare number is read as seconds. Zero is rejected.
pub fn parse_interval(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = match s.char_indices().last() {
        Some((idx, 'd')) => (&s[..idx], 86_400),
        Some((idx, 'h')) => (&s[..idx], 3_600),
        Some((idx, 'm')) => (&s[..idx], 60),
        Some((idx, 's')) => (&s[..idx], 1),
        _ => (s, 1),
    };

    let num: u64 = num_str.trim().parse().ok()?;
    if num == 0 {
        return None;
    }
    num.checked_mul(multiplier).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.listing_url, "https://www.thetimes.com/puzzles/printable");
        assert_eq!(config.download_dir, PathBuf::from("./puzzles"));
        assert_eq!(config.state_file, PathBuf::from("./puzzleScraperDatabase.json"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.extract.strategy, ExtractStrategy::Auto);
    }

    #[test]
    fn test_fetch_settings_default() {
        let fetch = FetchSettings::default();

        assert!(fetch.user_agent.contains("Mozilla"));
        assert_eq!(fetch.timeout_seconds, 30);
        assert_eq!(fetch.max_retries, 2);
        assert_eq!(fetch.retry_backoff_ms, 1000);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.fetch.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = AppConfig::default();
        config.listing_url = "not a url".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_user_agent() {
        let mut config = AppConfig::default();
        config.fetch.user_agent = "  ".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_user_agent() {
        let mut config = AppConfig::default();
        config.fetch.user_agent = "Mozilla/5.0\nX".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            download_dir = "/srv/puzzles"

            [extract]
            strategy = "embedded-json"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.download_dir, PathBuf::from("/srv/puzzles"));
        assert_eq!(config.extract.strategy, ExtractStrategy::EmbeddedJson);
        assert_eq!(config.extract.sentinel_name, "Puzzle");
        assert_eq!(config.fetch.timeout_seconds, 30);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.state_file, parsed.state_file);
        assert_eq!(config.extract.state_global, parsed.extract.state_global);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[fetch]\ntimeout_seconds = 0\n").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_parse_interval_units() {
        assert_eq!(parse_interval("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_interval("6h"), Some(Duration::from_secs(21_600)));
        assert_eq!(parse_interval("30m"), Some(Duration::from_secs(1_800)));
        assert_eq!(parse_interval("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_interval("120"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_interval_invalid() {
        assert_eq!(parse_interval(""), None);
        assert_eq!(parse_interval("abc"), None);
        assert_eq!(parse_interval("h"), None);
    }

    #[test]
    fn test_parse_interval_rejects_zero() {
        assert_eq!(parse_interval("0s"), None);
        assert_eq!(parse_interval("0"), None);
        assert_eq!(parse_interval("0d"), None);
    }
}
