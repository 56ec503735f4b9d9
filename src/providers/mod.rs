//! Rate source clients, one per external provider.

pub mod coingecko;
pub mod exchangerate;
pub mod util;

use crate::core::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Request and source metadata carried alongside a successful fetch. Feeds
/// the `meta` block of historical ledger records.
#[derive(Debug, Clone, Default)]
pub struct ProviderMeta {
    pub source: String,
    pub raw_id: String,
    pub request_ms: u64,
    pub status_code: u16,
    pub etag: String,
    pub base_currency: String,
}

/// Result of one provider fetch: canonical pair keys mapped to positive
/// rates. Both directions of every derivable pair are present, so consumers
/// never invert a rate themselves.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub rates: HashMap<String, f64>,
    pub meta: ProviderMeta,
}

impl FetchOutcome {
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Stable source name used for selection and reporting.
    fn name(&self) -> &str;

    /// Fetches rates from the provider. An empty-but-Ok outcome means the
    /// provider answered with zero usable pairs; transport and protocol
    /// problems are `CoreError::ApiRequest`.
    async fn fetch_rates(&self) -> Result<FetchOutcome>;
}
