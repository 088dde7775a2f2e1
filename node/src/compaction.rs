// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Periodic WAL compaction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use piyo::{CompactStats, WalStore};
use tokio::task::JoinHandle;

/// Compacts once on the blocking pool and records metrics.
pub async fn compact_once(store: Arc<WalStore>) -> anyhow::Result<CompactStats> {
    let start = Instant::now();
    let stats = tokio::task::spawn_blocking(move || store.compact()).await??;

    metrics::increment_counter!("piyo_compactions_total");
    metrics::histogram!("piyo_compaction_duration_seconds", start.elapsed().as_secs_f64());
    metrics::gauge!("piyo_live_events", stats.events_written as f64);
    Ok(stats)
}

/// Spawns a task compacting every `period`. Failures are logged and the
/// task keeps going; the store stays usable on the old log.
pub fn spawn_compaction(store: Arc<WalStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately and the WAL was compacted at open.
        interval.tick().await;
        loop {
            interval.tick().await;
            tracing::debug!("Auto-compacting WAL...");
            match compact_once(Arc::clone(&store)).await {
                Ok(stats) => tracing::info!(
                    records_read = stats.records_read,
                    events_written = stats.events_written,
                    "WAL compacted"
                ),
                Err(e) => tracing::error!("WAL compaction failed: {:#}", e),
            }
        }
    })
}
