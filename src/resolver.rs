//! Layered rate lookup: identity shortcut, snapshot cache, TTL-bounded
//! secondary cache, synchronous live refresh, failure.

use crate::core::cache::TtlCache;
use crate::core::currency::CurrencyRegistry;
use crate::core::error::{CoreError, Result};
use crate::core::rates::{RateEntry, pair_key};
use crate::store::RateStore;
use crate::updater::RatesUpdater;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A resolved rate together with the pair it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRate {
    pub pair: String,
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

impl ResolvedRate {
    fn from_entry(pair: String, entry: &RateEntry) -> Self {
        Self {
            pair,
            rate: entry.rate,
            updated_at: entry.updated_at,
            source: entry.source.clone(),
        }
    }
}

pub struct RateResolver {
    registry: Arc<CurrencyRegistry>,
    store: Arc<RateStore>,
    updater: Arc<RatesUpdater>,
    cache: Arc<TtlCache<String, RateEntry>>,
    ttl: Duration,
}

impl RateResolver {
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        store: Arc<RateStore>,
        updater: Arc<RatesUpdater>,
        cache: Arc<TtlCache<String, RateEntry>>,
        ttl: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            updater,
            cache,
            ttl,
        }
    }

    /// Resolves the rate from one currency to another.
    ///
    /// Tier order is strict: registry check (no I/O), identity shortcut,
    /// snapshot (served as-is regardless of age), secondary TTL cache, one
    /// synchronous refresh across all sources, then failure. A
    /// stale-but-present snapshot entry always wins over a network refresh.
    pub async fn resolve(&self, from: &str, to: &str) -> Result<ResolvedRate> {
        let from = self.registry.get(from)?.code().to_string();
        let to = self.registry.get(to)?.code().to_string();
        let key = pair_key(&from, &to);

        if from == to {
            return Ok(ResolvedRate {
                pair: key,
                rate: 1.0,
                updated_at: Utc::now(),
                source: "System".to_string(),
            });
        }

        let snapshot = self.store.read_snapshot();
        if let Some(entry) = snapshot.pairs.get(&key) {
            debug!(pair = %key, "serving rate from snapshot");
            self.cache
                .put(key.clone(), entry.clone(), Some(self.ttl))
                .await;
            return Ok(ResolvedRate::from_entry(key, entry));
        }

        if let Some(entry) = self.cache.get(&key).await {
            debug!(pair = %key, "serving rate from secondary cache");
            return Ok(ResolvedRate::from_entry(key, &entry));
        }

        info!(pair = %key, "rate not cached, triggering refresh");
        let result = self.updater.run_update(None).await;
        if result.is_total_failure() {
            return Err(CoreError::ApiRequest {
                reason: format!("rate refresh failed for all sources ({key})"),
            });
        }

        let snapshot = self.store.read_snapshot();
        if let Some(entry) = snapshot.pairs.get(&key) {
            self.cache
                .put(key.clone(), entry.clone(), Some(self.ttl))
                .await;
            return Ok(ResolvedRate::from_entry(key, entry));
        }

        Err(CoreError::RateUnavailable { pair: key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::updater::test_support::ScriptedSource;
    use tempfile::tempdir;

    fn leak(source: ScriptedSource) -> &'static ScriptedSource {
        Box::leak(Box::new(source))
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<RateStore>,
        cache: Arc<TtlCache<String, RateEntry>>,
        resolver: RateResolver,
    }

    fn fixture(sources: Vec<&'static ScriptedSource>, ttl: Duration) -> Fixture {
        let dir = tempdir().unwrap();
        let store = Arc::new(RateStore::new(dir.path()));
        let clients = sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn crate::providers::SourceClient>)
            .collect();
        let updater = Arc::new(RatesUpdater::with_clients(clients, Arc::clone(&store)));
        let cache = Arc::new(TtlCache::new());
        let registry = Arc::new(CurrencyRegistry::from_config(&AppConfig::default()));
        let resolver = RateResolver::new(
            registry,
            Arc::clone(&store),
            updater,
            Arc::clone(&cache),
            ttl,
        );
        Fixture {
            _dir: dir,
            store,
            cache,
            resolver,
        }
    }

    #[tokio::test]
    async fn test_identity_pair_is_synthetic_without_io() {
        let source = leak(ScriptedSource::succeeding("s", &[("BTC_USD", 1.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        let resolved = fx.resolver.resolve("btc", "BTC").await.unwrap();
        assert_eq!(resolved.rate, 1.0);
        assert_eq!(resolved.source, "System");
        assert_eq!(resolved.pair, "BTC_BTC");
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_currency_fails_before_any_fetch() {
        let source = leak(ScriptedSource::succeeding("s", &[("BTC_USD", 1.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        let err = fx.resolver.resolve("ZZZ", "USD").await.unwrap_err();
        assert!(matches!(err, CoreError::CurrencyNotFound { .. }));
        let err = fx.resolver.resolve("USD", "ZZZ").await.unwrap_err();
        assert!(matches!(err, CoreError::CurrencyNotFound { .. }));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_snapshot_entry_is_preferred_over_refresh() {
        let source = leak(ScriptedSource::succeeding("s", &[("BTC_USD", 2.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        // Seed a snapshot entry that is far older than any TTL.
        let mut snapshot = fx.store.read_snapshot();
        snapshot.pairs.insert(
            "BTC_USD".to_string(),
            RateEntry {
                rate: 1.0,
                updated_at: Utc::now() - chrono::Duration::days(365),
                source: "Ancient".to_string(),
            },
        );
        fx.store.write_snapshot(&snapshot).unwrap();

        let resolved = fx.resolver.resolve("BTC", "USD").await.unwrap();
        assert_eq!(resolved.rate, 1.0);
        assert_eq!(resolved.source, "Ancient");
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fresh_secondary_cache_entry_is_served() {
        let source = leak(ScriptedSource::succeeding("s", &[("ETH_USD", 9.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        fx.cache
            .put(
                "BTC_USD".to_string(),
                RateEntry {
                    rate: 3.5,
                    updated_at: Utc::now(),
                    source: "Cache".to_string(),
                },
                Some(Duration::from_secs(300)),
            )
            .await;

        let resolved = fx.resolver.resolve("BTC", "USD").await.unwrap();
        assert_eq!(resolved.rate, 3.5);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_secondary_cache_entry_triggers_refresh() {
        let source = leak(ScriptedSource::succeeding("s", &[("BTC_USD", 7.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        fx.cache
            .put(
                "BTC_USD".to_string(),
                RateEntry {
                    rate: 3.5,
                    updated_at: Utc::now(),
                    source: "Cache".to_string(),
                },
                Some(Duration::from_millis(1)),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let resolved = fx.resolver.resolve("BTC", "USD").await.unwrap();
        // The expired entry was ignored and the refresh result served.
        assert_eq!(resolved.rate, 7.0);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_miss_triggers_refresh_and_serves_result() {
        let source = leak(ScriptedSource::succeeding("s", &[("BTC_USD", 42.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        let resolved = fx.resolver.resolve("BTC", "USD").await.unwrap();
        assert_eq!(resolved.rate, 42.0);
        assert_eq!(source.call_count(), 1);

        // The refresh result is now in the secondary cache too.
        assert!(fx.cache.get(&"BTC_USD".to_string()).await.is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_as_api_request() {
        let source = leak(ScriptedSource::failing("s", "connection error"));
        let fx = fixture(vec![source], Duration::from_secs(300));

        let err = fx.resolver.resolve("BTC", "USD").await.unwrap_err();
        assert!(matches!(err, CoreError::ApiRequest { .. }));
    }

    #[tokio::test]
    async fn test_pair_absent_after_refresh_is_rate_unavailable() {
        let source = leak(ScriptedSource::succeeding("s", &[("ETH_USD", 9.0)]));
        let fx = fixture(vec![source], Duration::from_secs(300));

        let err = fx.resolver.resolve("BTC", "USD").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::RateUnavailable { pair } if pair == "BTC_USD"
        ));
    }
}
