//! Periodic checking until told to stop.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::check::{AlertCheck, ForecastMode};
use crate::record::UserRecordStore;

/// Counters for a finished watch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub cycles: u64,
    pub alerts: u64,
    pub failures: u64,
    /// Cycles skipped because no record was saved
    pub skipped: u64,
}

/// Run a check every `every` until `shutdown` resolves.
///
/// The record is reloaded each cycle so a `save` from another process takes
/// effect without a restart. A failed cycle is logged and counted; the loop
/// keeps going.
pub async fn watch<F>(
    check: &AlertCheck,
    store: &dyn UserRecordStore,
    every: Duration,
    shutdown: F,
) -> WatchStats
where
    F: Future<Output = ()>,
{
    let mut stats = WatchStats::default();
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!("Watching every {:?}", every);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Stopping watch after {} cycle(s)", stats.cycles);
                break;
            }
            _ = ticker.tick() => {
                stats.cycles += 1;
                run_cycle(check, store, &mut stats).await;
            }
        }
    }

    stats
}

async fn run_cycle(check: &AlertCheck, store: &dyn UserRecordStore, stats: &mut WatchStats) {
    let record = match store.load() {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::info!("No user record saved yet, skipping check");
            stats.skipped += 1;
            return;
        }
        Err(e) => {
            tracing::error!("Could not load user record: {}", e);
            stats.failures += 1;
            return;
        }
    };

    match check.run(&record, ForecastMode::Auto).await {
        Ok(outcome) if outcome.alerted() => stats.alerts += 1,
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Check for {} failed: {}", record.city, e);
            stats.failures += 1;
        }
    }
}
