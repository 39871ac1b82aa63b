//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::AggregatorOptions;

/// One configured activity feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Integration name (e.g. "garmin"), also the id prefix
    pub name: String,
    /// Feed base URL
    pub feed_url: String,
    /// Bearer token; without one the provider reports unauthorized
    pub access_token: Option<String>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Directory for the durable cache tier
    pub cache_dir: PathBuf,
    /// Item ceiling of the in-memory cache tier
    pub memory_cache_capacity: usize,
    /// Visibility preference for step-count records
    pub show_step_count: bool,
    /// Upper bound on each provider authorization check
    pub authorization_timeout_secs: u64,
    /// Upper bound on each provider bulk load
    pub load_timeout_secs: u64,
    /// Interval between background full reloads (0 disables)
    pub refresh_interval_secs: u64,
    /// Secret path segment for webhook pushes
    pub webhook_path_uuid: String,
    pub providers: Vec<ProviderConfig>,
    /// Optional feed of daily step-count records
    pub step_count_feed: Option<ProviderConfig>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            cache_dir: PathBuf::from("data/cache"),
            memory_cache_capacity: 16,
            show_step_count: true,
            authorization_timeout_secs: 10,
            load_timeout_secs: 60,
            refresh_interval_secs: 900,
            webhook_path_uuid: "test-webhook-uuid".to_string(),
            providers: Vec::new(),
            step_count_feed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `PROVIDERS` is a comma-separated list of names; each name needs
    /// `<NAME>_FEED_URL` and may set `<NAME>_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        let providers = env::var("PROVIDERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(provider_from_env)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            port: parse_or("PORT", defaults.port)?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            memory_cache_capacity: parse_or("MEMORY_CACHE_CAPACITY", defaults.memory_cache_capacity)?,
            show_step_count: parse_or("SHOW_STEP_COUNT", defaults.show_step_count)?,
            authorization_timeout_secs: parse_or(
                "AUTHORIZATION_TIMEOUT_SECS",
                defaults.authorization_timeout_secs,
            )?,
            load_timeout_secs: parse_or("LOAD_TIMEOUT_SECS", defaults.load_timeout_secs)?,
            refresh_interval_secs: parse_or("REFRESH_INTERVAL_SECS", defaults.refresh_interval_secs)?,
            webhook_path_uuid: env::var("WEBHOOK_PATH_UUID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WEBHOOK_PATH_UUID".to_string()))?,
            providers,
            step_count_feed: env::var("STEP_COUNT_FEED_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|feed_url| ProviderConfig {
                    name: "health".to_string(),
                    feed_url,
                    access_token: env::var("STEP_COUNT_ACCESS_TOKEN").ok(),
                }),
        })
    }

    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            show_step_count: self.show_step_count,
            authorization_timeout: Duration::from_secs(self.authorization_timeout_secs),
            load_timeout: Duration::from_secs(self.load_timeout_secs),
            ..AggregatorOptions::default()
        }
    }
}

fn provider_from_env(name: &str) -> Result<ProviderConfig, ConfigError> {
    let prefix = name.to_ascii_uppercase();
    let url_var = format!("{}_FEED_URL", prefix);
    let feed_url = env::var(&url_var).map_err(|_| ConfigError::Missing(url_var))?;
    let access_token = env::var(format!("{}_ACCESS_TOKEN", prefix))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Ok(ProviderConfig {
        name: name.to_ascii_lowercase(),
        feed_url,
        access_token,
    })
}

fn parse_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}
