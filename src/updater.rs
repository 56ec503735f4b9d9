//! Coordinates one refresh across the configured rate sources, tolerating
//! per-source failure.

use crate::config::AppConfig;
use crate::core::error::Result;
use crate::core::rates::{
    HistoricalRecord, RateEntry, RecordMeta, UpdateResult, split_pair_key,
};
use crate::providers::coingecko::CoinGeckoClient;
use crate::providers::exchangerate::ExchangeRateApiClient;
use crate::providers::{FetchOutcome, SourceClient};
use crate::store::RateStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Freshness report over the persisted snapshot.
#[derive(Debug, Clone)]
pub struct UpdateStatus {
    pub last_refresh: Option<DateTime<Utc>>,
    pub age_seconds: Option<i64>,
    pub is_fresh: bool,
}

pub struct RatesUpdater {
    clients: Vec<Box<dyn SourceClient>>,
    store: Arc<RateStore>,
}

impl RatesUpdater {
    pub fn new(config: &AppConfig, store: Arc<RateStore>) -> Result<Self> {
        let mut clients: Vec<Box<dyn SourceClient>> = Vec::new();

        if let Some(provider) = &config.providers.coingecko {
            clients.push(Box::new(CoinGeckoClient::new(&provider.base_url, config)?));
        }
        if let Some(provider) = &config.providers.exchangerate {
            clients.push(Box::new(ExchangeRateApiClient::new(
                &provider.base_url,
                config,
            )?));
        }

        Ok(Self::with_clients(clients, store))
    }

    pub fn with_clients(clients: Vec<Box<dyn SourceClient>>, store: Arc<RateStore>) -> Self {
        Self { clients, store }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    /// Runs one aggregate update. `None` selects every configured source.
    /// Sources are processed sequentially; a failing or empty source is
    /// recorded and never blocks the remaining ones. Unknown source names
    /// are skipped with a warning.
    pub async fn run_update(&self, sources: Option<&[String]>) -> UpdateResult {
        let requested: Vec<String> = match sources {
            Some(names) => names.to_vec(),
            None => self.source_names(),
        };

        let started_at = Utc::now();
        let mut successful_sources = Vec::new();
        let mut failed_sources = Vec::new();
        let mut total_rates = 0;

        for name in &requested {
            let Some(client) = self.clients.iter().find(|c| c.name() == name) else {
                warn!(source = %name, "unknown rate source, skipping");
                continue;
            };

            info!(source = %name, "fetching rates");
            match client.fetch_rates().await {
                Ok(outcome) if !outcome.is_empty() => match self.write_through(&outcome).await {
                    Ok(count) => {
                        info!(source = %name, rates = count, "rates merged");
                        successful_sources.push(name.clone());
                        total_rates += count;
                    }
                    Err(e) => {
                        error!(source = %name, error = %e, "failed to persist rates");
                        failed_sources.push(name.clone());
                    }
                },
                Ok(_) => {
                    warn!(source = %name, "no rates received");
                    failed_sources.push(name.clone());
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "fetch failed");
                    failed_sources.push(name.clone());
                }
            }
        }

        let finished_at = Utc::now();
        let result = UpdateResult {
            successful_sources,
            failed_sources,
            total_rates,
            started_at,
            finished_at,
            duration_seconds: (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
        };

        if result.is_total_failure() {
            error!("update failed for all sources");
        } else if result.is_partial_failure() {
            warn!("update completed with partial success");
        } else {
            info!("update completed successfully");
        }
        result
    }

    /// Snapshot overlay plus ledger append for one source, under the store's
    /// write guard. Fetched pairs overwrite existing ones; pairs from other
    /// sources survive.
    async fn write_through(&self, outcome: &FetchOutcome) -> Result<usize> {
        let _guard = self.store.lock_writes().await;
        let now = Utc::now();

        let mut snapshot = self.store.read_snapshot();
        for (pair, rate) in &outcome.rates {
            snapshot.pairs.insert(
                pair.clone(),
                RateEntry {
                    rate: *rate,
                    updated_at: now,
                    source: outcome.meta.source.clone(),
                },
            );
        }
        snapshot.last_refresh = Some(now);
        snapshot.source = outcome.meta.source.clone();
        self.store.write_snapshot(&snapshot)?;

        let records: Vec<HistoricalRecord> = outcome
            .rates
            .iter()
            .map(|(pair, rate)| {
                let (from, to) = split_pair_key(pair).unwrap_or((pair.as_str(), ""));
                HistoricalRecord {
                    id: self.store.next_record_id(pair, now),
                    from_currency: from.to_string(),
                    to_currency: to.to_string(),
                    rate: *rate,
                    timestamp: now,
                    source: outcome.meta.source.clone(),
                    meta: RecordMeta {
                        raw_id: outcome.meta.raw_id.clone(),
                        request_ms: outcome.meta.request_ms,
                        status_code: outcome.meta.status_code,
                        etag: outcome.meta.etag.clone(),
                        base_currency: outcome.meta.base_currency.clone(),
                    },
                }
            })
            .collect();
        self.store.append_history(&records)?;

        Ok(outcome.rates.len())
    }

    pub fn update_status(&self, ttl: Duration) -> UpdateStatus {
        let snapshot = self.store.read_snapshot();
        let age_seconds = snapshot
            .last_refresh
            .map(|ts| (Utc::now() - ts).num_seconds());
        UpdateStatus {
            last_refresh: snapshot.last_refresh,
            is_fresh: age_seconds.is_some_and(|age| age >= 0 && (age as u64) < ttl.as_secs()),
            age_seconds,
        }
    }
}
