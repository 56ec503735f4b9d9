//! Durable persistence for the current rate snapshot and the append-only
//! historical ledger. Atomic rename is the sole consistency mechanism:
//! readers never observe a partially-written file, but concurrent writers in
//! other processes still race (last write wins on the snapshot).

use crate::core::error::{CoreError, Result};
use crate::core::rates::{HistoricalRecord, Snapshot};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const RATES_FILE: &str = "rates.json";
const HISTORY_FILE: &str = "exchange_rates.json";

pub struct RateStore {
    rates_path: PathBuf,
    history_path: PathBuf,
    write_lock: Mutex<()>,
    record_seq: AtomicU64,
}

impl RateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            rates_path: data_dir.join(RATES_FILE),
            history_path: data_dir.join(HISTORY_FILE),
            write_lock: Mutex::new(()),
            record_seq: AtomicU64::new(0),
        }
    }

    /// Serializes in-process writers (coordinator write-through, prune job).
    /// Hold the guard across every snapshot/ledger mutation that must be
    /// observed together.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Returns the last successfully written snapshot. A missing file is a
    /// normal cold-start state; a corrupt file is logged and treated the
    /// same way. Never fails.
    pub fn read_snapshot(&self) -> Snapshot {
        read_json_lenient(&self.rates_path).unwrap_or_default()
    }

    /// Atomically replaces the snapshot file. On failure the temporary
    /// artifact is removed and the previous snapshot stays intact.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        write_json_atomic(&self.rates_path, snapshot)?;
        debug!(pairs = snapshot.pairs.len(), "snapshot written");
        Ok(())
    }

    /// Returns the full historical ledger; corrupt or missing ledgers read
    /// as empty.
    pub fn read_history(&self) -> Vec<HistoricalRecord> {
        read_json_lenient(&self.history_path).unwrap_or_default()
    }

    /// Appends records to the ledger with the load-extend-rewrite
    /// discipline. The rewrite itself is atomic.
    pub fn append_history(&self, records: &[HistoricalRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut history = self.read_history();
        history.extend_from_slice(records);
        write_json_atomic(&self.history_path, &history)?;
        debug!(appended = records.len(), total = history.len(), "ledger appended");
        Ok(())
    }

    /// Removes ledger records older than `max_age_days`, rewriting the file
    /// only when something was removed. Returns the removed count.
    pub fn prune_history(&self, max_age_days: u32) -> Result<usize> {
        let history = self.read_history();
        if history.is_empty() {
            return Ok(0);
        }

        let cutoff = Utc::now() - Duration::days(max_age_days as i64);
        let kept: Vec<HistoricalRecord> = history
            .iter()
            .filter(|record| record.timestamp > cutoff)
            .cloned()
            .collect();

        let removed = history.len() - kept.len();
        if removed > 0 {
            write_json_atomic(&self.history_path, &kept)?;
            debug!(removed, "ledger pruned");
        }
        Ok(removed)
    }

    /// Collision-free ledger record id: pair, microsecond timestamp and a
    /// per-process sequence number.
    pub fn next_record_id(&self, pair: &str, timestamp: DateTime<Utc>) -> String {
        let seq = self.record_seq.fetch_add(1, Ordering::Relaxed);
        format!("{pair}-{}-{seq}", timestamp.timestamp_micros())
    }
}

fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable data file, treating as empty");
            None
        }
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let persist_err = |reason: String| CoreError::Persistence {
        path: path.display().to_string(),
        reason,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| persist_err(e.to_string()))?;

    // NamedTempFile removes itself on drop, so a failed serialization or
    // rename leaves no artifact behind.
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| persist_err(e.to_string()))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| persist_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| persist_err(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::{RateEntry, RecordMeta};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let now = Utc::now();
        let mut pairs = HashMap::new();
        pairs.insert(
            "BTC_USD".to_string(),
            RateEntry {
                rate: 59337.21,
                updated_at: now,
                source: "CoinGecko".to_string(),
            },
        );
        pairs.insert(
            "USD_BTC".to_string(),
            RateEntry {
                rate: 1.0 / 59337.21,
                updated_at: now,
                source: "CoinGecko".to_string(),
            },
        );
        Snapshot {
            pairs,
            last_refresh: Some(now),
            source: "CoinGecko".to_string(),
        }
    }

    fn sample_record(pair: &str, age_days: i64) -> HistoricalRecord {
        let timestamp = Utc::now() - Duration::days(age_days);
        HistoricalRecord {
            id: format!("{pair}-{}-0", timestamp.timestamp_micros()),
            from_currency: pair.split('_').next().unwrap().to_string(),
            to_currency: pair.split('_').nth(1).unwrap().to_string(),
            rate: 1.23,
            timestamp,
            source: "CoinGecko".to_string(),
            meta: RecordMeta::default(),
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        let snapshot = sample_snapshot();
        store.write_snapshot(&snapshot).unwrap();
        assert_eq!(store.read_snapshot(), snapshot);
    }

    #[test]
    fn test_missing_snapshot_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        let snapshot = store.read_snapshot();
        assert!(snapshot.pairs.is_empty());
        assert!(snapshot.last_refresh.is_none());
    }

    #[test]
    fn test_corrupt_snapshot_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        fs::write(dir.path().join(RATES_FILE), "{truncated").unwrap();
        let snapshot = store.read_snapshot();
        assert!(snapshot.pairs.is_empty());
    }

    struct FailsToSerialize;

    impl Serialize for FailsToSerialize {
        fn serialize<S: serde::Serializer>(
            &self,
            _serializer: S,
        ) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("injected mid-write failure"))
        }
    }

    #[test]
    fn test_failed_write_preserves_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        let good = sample_snapshot();
        store.write_snapshot(&good).unwrap();

        // Abort a replacement write before the rename happens.
        let err = write_json_atomic(&store.rates_path, &FailsToSerialize).unwrap_err();
        assert!(matches!(err, CoreError::Persistence { .. }));

        assert_eq!(store.read_snapshot(), good);

        // The aborted temp file must not linger next to the snapshot.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != RATES_FILE)
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
    }

    #[test]
    fn test_append_history_accumulates() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        store.append_history(&[sample_record("BTC_USD", 0)]).unwrap();
        store
            .append_history(&[sample_record("EUR_USD", 0), sample_record("USD_EUR", 0)])
            .unwrap();

        let history = store.read_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].from_currency, "BTC");
    }

    #[test]
    fn test_corrupt_ledger_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        fs::write(dir.path().join(HISTORY_FILE), "not json").unwrap();
        assert!(store.read_history().is_empty());

        // Appends still work after corruption.
        store.append_history(&[sample_record("BTC_USD", 0)]).unwrap();
        assert_eq!(store.read_history().len(), 1);
    }

    #[test]
    fn test_prune_removes_only_out_of_age_records() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        store
            .append_history(&[sample_record("BTC_USD", 31), sample_record("EUR_USD", 1)])
            .unwrap();

        let removed = store.prune_history(30).unwrap();
        assert_eq!(removed, 1);

        let history = store.read_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_currency, "EUR");
    }

    #[test]
    fn test_prune_noop_returns_zero() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        assert_eq!(store.prune_history(30).unwrap(), 0);

        store.append_history(&[sample_record("BTC_USD", 1)]).unwrap();
        let mtime_before = fs::metadata(dir.path().join(HISTORY_FILE))
            .unwrap()
            .modified()
            .unwrap();

        assert_eq!(store.prune_history(30).unwrap(), 0);
        let mtime_after = fs::metadata(dir.path().join(HISTORY_FILE))
            .unwrap()
            .modified()
            .unwrap();
        // Nothing removed, nothing rewritten.
        assert_eq!(mtime_before, mtime_after);
    }

    #[test]
    fn test_record_ids_are_unique_within_one_instant() {
        let dir = tempdir().unwrap();
        let store = RateStore::new(dir.path());

        let now = Utc::now();
        let a = store.next_record_id("BTC_USD", now);
        let b = store.next_record_id("BTC_USD", now);
        assert_ne!(a, b);
    }
}
