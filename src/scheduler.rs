//! Background scheduling: a recurring rates refresh plus a daily ledger
//! prune. Jobs are tokio tasks wound down through a watch channel, so
//! stopping never cuts an in-flight fetch short; it only prevents future
//! firings.

use crate::store::RateStore;
use crate::updater::RatesUpdater;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const PRUNE_MAX_AGE_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub jobs_count: usize,
    pub update_interval_minutes: u64,
    pub last_refresh: Option<DateTime<Utc>>,
    pub age_seconds: Option<i64>,
    pub is_fresh: bool,
}

struct RunningJobs {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

pub struct ParserScheduler {
    updater: Arc<RatesUpdater>,
    store: Arc<RateStore>,
    update_interval: Duration,
    update_interval_minutes: u64,
    ttl: Duration,
    state: Mutex<Option<RunningJobs>>,
}

impl ParserScheduler {
    pub fn new(
        updater: Arc<RatesUpdater>,
        store: Arc<RateStore>,
        update_interval_minutes: u64,
        ttl: Duration,
    ) -> Self {
        // tokio intervals panic on a zero period, which would kill the
        // spawned job without surfacing anywhere.
        let update_interval_minutes = update_interval_minutes.max(1);
        Self {
            updater,
            store,
            update_interval: Duration::from_secs(update_interval_minutes * 60),
            update_interval_minutes,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Spawns the refresh and prune jobs. The refresh job's first tick fires
    /// immediately, which doubles as the initial out-of-band refresh. No-op
    /// with a warning when already running. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) {
        let mut state = self.state.lock().unwrap();
        if state.is_some() {
            warn!("scheduler is already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let refresh = tokio::spawn(refresh_job(
            Arc::clone(&self.updater),
            self.update_interval,
            shutdown_rx.clone(),
        ));
        let prune = tokio::spawn(prune_job(Arc::clone(&self.store), shutdown_rx));

        *state = Some(RunningJobs {
            shutdown_tx,
            handles: vec![refresh, prune],
        });
        info!(
            update_interval_minutes = self.update_interval_minutes,
            "parser scheduler started"
        );
    }

    /// Signals both jobs to wind down. No-op when not running.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        match state.take() {
            Some(jobs) => {
                let _ = jobs.shutdown_tx.send(true);
                info!("parser scheduler stopped");
            }
            None => debug!("scheduler is not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().is_some()
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().unwrap();
        let jobs_count = state
            .as_ref()
            .map_or(0, |jobs| jobs.handles.iter().filter(|h| !h.is_finished()).count());
        let update_status = self.updater.update_status(self.ttl);

        SchedulerStatus {
            is_running: state.is_some(),
            jobs_count,
            update_interval_minutes: self.update_interval_minutes,
            last_refresh: update_status.last_refresh,
            age_seconds: update_status.age_seconds,
            is_fresh: update_status.is_fresh,
        }
    }
}

impl Drop for ParserScheduler {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(jobs) = state.take() {
                let _ = jobs.shutdown_tx.send(true);
            }
        }
    }
}

async fn refresh_job(
    updater: Arc<RatesUpdater>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                debug!("running scheduled rates update");
                let result = updater.run_update(None).await;
                if result.is_total_failure() {
                    error!("scheduled update failed for all sources");
                } else if result.is_partial_failure() {
                    warn!("scheduled update completed with some failures");
                } else {
                    info!("scheduled update completed successfully");
                }
            }
        }
    }
}

async fn prune_job(store: Arc<RateStore>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
    // The first tick resolves immediately; skip it so pruning starts a full
    // interval after start-up.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                debug!("running scheduled data cleanup");
                let _guard = store.lock_writes().await;
                match store.prune_history(PRUNE_MAX_AGE_DAYS) {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "cleaned up old ledger records"),
                    Err(e) => error!(error = %e, "scheduled cleanup failed"),
                }
            }
        }
    }
}
