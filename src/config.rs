//! Runtime configuration
//!
//! Defaults match the behaviour of the hosted app; every value can be
//! overridden from the environment so tests and the CLI can shorten delays
//! or relocate the data directory.

use crate::error::{Result, SerenityError};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FALLBACK_DELAY_MS: u64 = 1000;
const DEFAULT_AUTH_LATENCY_MS: u64 = 1000;
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-sonar-small-128k-online";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding serenity.db
    pub data_dir: PathBuf,
    /// Directory for daily log files
    pub log_dir: PathBuf,
    /// Simulated "thinking" delay before a static fallback reply
    pub fallback_delay: Duration,
    /// Simulated network latency of the built-in identity provider
    pub auth_latency: Duration,
    /// Base URL of a remote identity provider; None uses the simulated one
    pub identity_url: Option<String>,
    pub llm_model: String,
    /// Echo log lines to stderr
    pub log_to_console: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("serenity");
        Self {
            log_dir: data_dir.join("logs"),
            data_dir,
            fallback_delay: Duration::from_millis(DEFAULT_FALLBACK_DELAY_MS),
            auth_latency: Duration::from_millis(DEFAULT_AUTH_LATENCY_MS),
            identity_url: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            log_to_console: false,
        }
    }
}

impl AppConfig {
    /// Build a config from defaults plus `SERENITY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("SERENITY_DATA_DIR") {
            config.data_dir = PathBuf::from(&dir);
            config.log_dir = config.data_dir.join("logs");
        }
        if let Ok(dir) = std::env::var("SERENITY_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Ok(ms) = std::env::var("SERENITY_FALLBACK_DELAY_MS") {
            config.fallback_delay = Duration::from_millis(parse_millis("SERENITY_FALLBACK_DELAY_MS", &ms)?);
        }
        if let Ok(ms) = std::env::var("SERENITY_AUTH_LATENCY_MS") {
            config.auth_latency = Duration::from_millis(parse_millis("SERENITY_AUTH_LATENCY_MS", &ms)?);
        }
        if let Ok(url) = std::env::var("SERENITY_IDENTITY_URL") {
            if !url.trim().is_empty() {
                config.identity_url = Some(url.trim_end_matches('/').to_string());
            }
        }
        if let Ok(model) = std::env::var("SERENITY_LLM_MODEL") {
            config.llm_model = model;
        }
        config.log_to_console = std::env::var("SERENITY_LOG_CONSOLE").is_ok();

        Ok(config)
    }

    /// Point both data and logs at `dir`
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir.join("logs");
        self.data_dir = dir;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("serenity.db")
    }
}

fn parse_millis(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| SerenityError::Config(format!("{} must be a number of milliseconds, got {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fallback_delay, Duration::from_secs(1));
        assert_eq!(config.auth_latency, Duration::from_secs(1));
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert!(config.identity_url.is_none());
        assert!(config.db_path().ends_with("serenity.db"));
    }

    #[test]
    fn test_with_data_dir_moves_logs() {
        let config = AppConfig::default().with_data_dir(PathBuf::from("/var/serenity"));
        assert_eq!(config.db_path(), PathBuf::from("/var/serenity/serenity.db"));
        assert_eq!(config.log_dir, PathBuf::from("/var/serenity/logs"));
    }

    #[test]
    fn test_parse_millis_rejects_garbage() {
        assert_eq!(parse_millis("X", " 250 ").unwrap(), 250);
        assert!(matches!(parse_millis("X", "soon"), Err(SerenityError::Config(_))));
    }
}
