use crate::core::client::CacheSettings;
use crate::core::pair::CurrencyPair;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlphaVantageConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_api_key() -> String {
    "demo".to_string()
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        AlphaVantageConfig {
            base_url: default_base_url(),
            api_key: default_api_key(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub alpha_vantage: AlphaVantageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_price_ttl")]
    pub price_ttl_secs: u64,
    #[serde(default = "default_history_ttl")]
    pub history_ttl_secs: u64,
}

fn default_price_ttl() -> u64 {
    5 * 60
}

fn default_history_ttl() -> u64 {
    60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            price_ttl_secs: default_price_ttl(),
            history_ttl_secs: default_history_ttl(),
        }
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        CacheSettings {
            price_ttl: Duration::from_secs(config.price_ttl_secs),
            history_ttl: Duration::from_secs(config.history_ttl_secs),
        }
    }
}

fn default_pairs() -> Vec<String> {
    [
        "EUR/USD", "GBP/USD", "USD/JPY", "USD/CHF", "AUD/USD", "USD/CAD", "NZD/USD", "EUR/GBP",
        "EUR/JPY", "GBP/JPY",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            pairs: default_pairs(),
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "fxwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "codito", "fxwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Configured pairs, parsed. Fails on the first invalid entry.
    pub fn tracked_pairs(&self) -> Result<Vec<CurrencyPair>> {
        self.pairs
            .iter()
            .map(|p| {
                p.parse::<CurrencyPair>()
                    .with_context(|| format!("Invalid pair in config: {p}"))
            })
            .collect()
    }

    /// API key from the environment if set, else from the config file.
    pub fn api_key(&self) -> String {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| self.providers.alpha_vantage.api_key.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.providers
            .alpha_vantage
            .timeout_secs
            .map(Duration::from_secs)
    }
}
