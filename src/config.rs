use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoProviderConfig>,
    pub exchangerate: Option<ExchangeRateProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
            }),
            exchangerate: Some(ExchangeRateProviderConfig {
                base_url: "https://v6.exchangerate-api.com/v6".to_string(),
                api_key: None,
            }),
        }
    }
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_fiat_currencies() -> Vec<String> {
    ["EUR", "GBP", "RUB", "JPY", "CNY", "CHF", "CAD", "AUD"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_crypto_currencies() -> Vec<String> {
    ["BTC", "ETH", "SOL", "BNB", "XRP", "ADA", "DOGE", "DOT"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_update_interval_minutes() -> u64 {
    5
}

fn default_rates_ttl_seconds() -> u64 {
    300
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_fiat_currencies")]
    pub fiat_currencies: Vec<String>,
    #[serde(default = "default_crypto_currencies")]
    pub crypto_currencies: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_update_interval_minutes")]
    pub update_interval_minutes: u64,
    #[serde(default = "default_rates_ttl_seconds")]
    pub rates_ttl_seconds: u64,
    pub data_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            base_currency: default_base_currency(),
            fiat_currencies: default_fiat_currencies(),
            crypto_currencies: default_crypto_currencies(),
            request_timeout_secs: default_request_timeout_secs(),
            update_interval_minutes: default_update_interval_minutes(),
            rates_ttl_seconds: default_rates_ttl_seconds(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "valutahub", "valutahub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fiat_currencies.is_empty() {
            anyhow::bail!("fiat_currencies must not be empty");
        }
        if self.crypto_currencies.is_empty() {
            anyhow::bail!("crypto_currencies must not be empty");
        }
        if self.base_currency.trim().is_empty() {
            anyhow::bail!("base_currency must not be empty");
        }
        if self.update_interval_minutes == 0 {
            anyhow::bail!("update_interval_minutes must be greater than zero");
        }
        Ok(())
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_dir {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "valutahub", "valutahub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Resolves the exchangerate-api key: the environment variable wins over
    /// the config file; a placeholder is used when neither is set so the
    /// failure surfaces as HTTP 401 from the provider.
    pub fn exchangerate_api_key(&self) -> String {
        std::env::var("EXCHANGERATE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.providers
                    .exchangerate
                    .as_ref()
                    .and_then(|p| p.api_key.clone())
            })
            .unwrap_or_else(|| "demo_key".to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rates_ttl(&self) -> Duration {
        Duration::from_secs(self.rates_ttl_seconds)
    }
}
