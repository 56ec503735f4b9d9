use crate::config::AppConfig;
use crate::core::error::Result;
use crate::core::rates::pair_key;
use crate::providers::util::{build_http_client, get_json};
use crate::providers::{FetchOutcome, ProviderMeta, SourceClient};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{instrument, warn};

pub const SOURCE_NAME: &str = "CoinGecko";

/// Maps a currency code to the provider-specific coin id.
pub fn coin_id(code: &str) -> Option<&'static str> {
    match code {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "BNB" => Some("binancecoin"),
        "XRP" => Some("ripple"),
        "ADA" => Some("cardano"),
        "DOGE" => Some("dogecoin"),
        "DOT" => Some("polkadot"),
        _ => None,
    }
}

/// Crypto rates via the coingecko-style `simple/price` listing. Quotes are
/// requested against USD and paired with the configured base currency.
pub struct CoinGeckoClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    base_currency: String,
    // (code, provider id) for every configured crypto with a known id
    coins: Vec<(String, &'static str)>,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, config: &AppConfig) -> Result<Self> {
        let mut coins = Vec::new();
        for code in &config.crypto_currencies {
            let code = code.to_uppercase();
            match coin_id(&code) {
                Some(id) => coins.push((code, id)),
                None => warn!(code = %code, "no CoinGecko id for crypto code, skipping"),
            }
        }

        Ok(Self {
            base_url: base_url.to_string(),
            client: build_http_client()?,
            timeout: config.request_timeout(),
            base_currency: config.base_currency.to_uppercase(),
            coins,
        })
    }
}

// id -> {"usd": rate}
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[async_trait]
impl SourceClient for CoinGeckoClient {
    fn name(&self) -> &str {
        "coingecko"
    }

    #[instrument(name = "CoinGeckoFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<FetchOutcome> {
        let ids = self
            .coins
            .iter()
            .map(|(_, id)| *id)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, ids
        );

        let response = get_json::<SimplePriceResponse>(&self.client, &url, self.timeout).await?;

        let mut rates = HashMap::new();
        for (code, id) in &self.coins {
            let Some(price) = response.data.get(*id).and_then(|q| q.get("usd")) else {
                continue;
            };
            // Non-positive quotes are data-source errors; drop both directions.
            if *price <= 0.0 {
                warn!(code = %code, price, "non-positive quote from provider, skipping");
                continue;
            }
            rates.insert(pair_key(code, &self.base_currency), *price);
            rates.insert(pair_key(&self.base_currency, code), 1.0 / *price);
        }

        Ok(FetchOutcome {
            rates,
            meta: ProviderMeta {
                source: SOURCE_NAME.to_string(),
                raw_id: ids,
                request_ms: response.request_ms,
                status_code: response.status_code,
                etag: response.etag,
                base_currency: self.base_currency.clone(),
            },
        })
    }
}
