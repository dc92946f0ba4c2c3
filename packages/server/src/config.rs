use anyhow::{Context, Result};
use dotenvy::dotenv;
use extraction::{ExtractorConfig, SanitizeMode, DEFAULT_LISTING_ROW_SELECTOR};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding the cache snapshot and the built books
    pub data_dir: PathBuf,
    /// File name of the job cache snapshot inside `data_dir`
    pub cache_file: String,
    /// How long a request waits for the client to open its channel
    pub trace_wait_timeout: Duration,
    pub sanitize_mode: SanitizeMode,
    pub body_selector: String,
    pub published_selector: String,
    pub listing_row_selector: String,
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let extractor = ExtractorConfig::default();
        Self {
            port: 3000,
            data_dir: PathBuf::from("tmp"),
            cache_file: "saved_epubs.json".to_string(),
            trace_wait_timeout: Duration::from_secs(30),
            sanitize_mode: extractor.sanitize,
            body_selector: extractor.body_selector,
            published_selector: extractor.published_selector,
            listing_row_selector: DEFAULT_LISTING_ROW_SELECTOR.to_string(),
            user_agent: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        let defaults = Self::default();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .context("PORT must be a valid number")?,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_file: env::var("CACHE_FILE").unwrap_or(defaults.cache_file),
            trace_wait_timeout: match env::var("TRACE_WAIT_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(
                    secs.parse()
                        .context("TRACE_WAIT_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                Err(_) => defaults.trace_wait_timeout,
            },
            sanitize_mode: match env::var("SANITIZE_MODE") {
                Ok(mode) => mode
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("SANITIZE_MODE must be 'first' or 'all'")?,
                Err(_) => defaults.sanitize_mode,
            },
            body_selector: env::var("BODY_SELECTOR").unwrap_or(defaults.body_selector),
            published_selector: env::var("PUBLISHED_SELECTOR")
                .unwrap_or(defaults.published_selector),
            listing_row_selector: env::var("LISTING_ROW_SELECTOR")
                .unwrap_or(defaults.listing_row_selector),
            user_agent: env::var("USER_AGENT").ok(),
        })
    }

    /// Full path of the job cache snapshot
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.cache_file)
    }

    /// Extractor settings for chapter pages
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::default()
            .with_body_selector(self.body_selector.clone())
            .with_published_selector(self.published_selector.clone())
            .with_sanitize(self.sanitize_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_layout() {
        let config = Config::default();
        assert_eq!(config.cache_path(), PathBuf::from("tmp/saved_epubs.json"));
        assert_eq!(config.sanitize_mode, SanitizeMode::First);
        assert_eq!(config.extractor_config().body_selector, "#HetVerhaal");
    }
}
