//! Core rate types: the current snapshot, the historical ledger and the
//! aggregate update outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical key for an ordered currency pair, e.g. `BTC_USD`.
pub fn pair_key(from: &str, to: &str) -> String {
    format!("{}_{}", from.to_uppercase(), to.to_uppercase())
}

/// Splits a canonical pair key back into `(from, to)` codes.
pub fn split_pair_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('_')
}

/// One rate inside the current snapshot. Persisted entries always carry a
/// positive rate; non-positive values are rejected at the provider boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

/// The single current-state rate cache, replaced wholesale on every
/// successful write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub pairs: HashMap<String, RateEntry>,
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
}

/// Request-level metadata attached to every historical record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub raw_id: String,
    pub request_ms: u64,
    pub status_code: u16,
    pub etag: String,
    pub base_currency: String,
}

/// One observed rate in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub meta: RecordMeta,
}

/// Outcome of one coordinated refresh across providers. Returned to the
/// caller, never persisted.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub successful_sources: Vec<String>,
    pub failed_sources: Vec<String>,
    pub total_rates: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl UpdateResult {
    /// True only when every requested source failed or returned nothing.
    pub fn is_total_failure(&self) -> bool {
        self.successful_sources.is_empty()
    }

    pub fn is_partial_failure(&self) -> bool {
        !self.successful_sources.is_empty() && !self.failed_sources.is_empty()
    }
}
