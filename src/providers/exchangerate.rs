use crate::config::AppConfig;
use crate::core::error::{CoreError, Result};
use crate::core::rates::pair_key;
use crate::providers::util::{build_http_client, get_json};
use crate::providers::{FetchOutcome, ProviderMeta, SourceClient};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{instrument, warn};

pub const SOURCE_NAME: &str = "ExchangeRate-API";

/// Fiat rates via the exchangerate-api style base-currency table.
pub struct ExchangeRateApiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
    base_currency: String,
    fiat_codes: Vec<String>,
}

impl ExchangeRateApiClient {
    pub fn new(base_url: &str, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            api_key: config.exchangerate_api_key(),
            client: build_http_client()?,
            timeout: config.request_timeout(),
            base_currency: config.base_currency.to_uppercase(),
            fiat_codes: config
                .fiat_currencies
                .iter()
                .map(|c| c.to_uppercase())
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

#[async_trait]
impl SourceClient for ExchangeRateApiClient {
    fn name(&self) -> &str {
        "exchangerate"
    }

    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<FetchOutcome> {
        let url = format!(
            "{}/{}/latest/{}",
            self.base_url, self.api_key, self.base_currency
        );

        let response = get_json::<LatestRatesResponse>(&self.client, &url, self.timeout).await?;
        let data = response.data;

        if data.result != "success" {
            return Err(CoreError::ApiRequest {
                reason: format!(
                    "API returned an error: {}",
                    data.error_type.as_deref().unwrap_or("unknown")
                ),
            });
        }

        let base = data
            .base_code
            .unwrap_or_else(|| self.base_currency.clone());

        let mut rates = HashMap::new();
        for code in &self.fiat_codes {
            let Some(rate) = data.conversion_rates.get(code) else {
                continue;
            };
            if *rate <= 0.0 {
                warn!(code = %code, rate, "non-positive rate from provider, skipping");
                continue;
            }
            rates.insert(pair_key(code, &base), *rate);
            rates.insert(pair_key(&base, code), 1.0 / *rate);
        }
        rates.insert(pair_key(&base, &base), 1.0);

        Ok(FetchOutcome {
            rates,
            meta: ProviderMeta {
                source: SOURCE_NAME.to_string(),
                raw_id: String::new(),
                request_ms: response.request_ms,
                status_code: response.status_code,
                etag: response.etag,
                base_currency: base,
            },
        })
    }
}
