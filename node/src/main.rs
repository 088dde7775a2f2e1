// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use piyo::{InMemoryStore, WalStore};
use piyo_node::compaction::spawn_compaction;
use piyo_node::config::NodeConfig;
use piyo_node::server::{build_router, SharedStore};
use piyo_node::telemetry::init_telemetry;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry()?;

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing piyo node with config: {:?}", cfg);

    let store: SharedStore = match &cfg.wal_path {
        Some(path) => {
            let options = cfg.wal_options();
            let path_for_open = path.clone();
            let wal_store = tokio::task::spawn_blocking(move || {
                WalStore::open_with(&path_for_open, options)
            })
            .await?
            .with_context(|| format!("Failed to open WAL at {:?}", path))?;
            let wal_store = Arc::new(wal_store);

            if let Some(secs) = cfg.compact_interval_secs {
                tracing::info!("Compacting WAL every {}s", secs);
                spawn_compaction(Arc::clone(&wal_store), Duration::from_secs(secs));
            }
            wal_store as SharedStore
        }
        None => {
            tracing::warn!("No WAL configured: events are kept in memory only");
            Arc::new(InMemoryStore::new()) as SharedStore
        }
    };

    let app = build_router(store);

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
