// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() -> anyhow::Result<()> {
    // 1. Initialize Tracing (Logs)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "piyo_node=debug,piyo=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Initialize Metrics (Prometheus)
    let handle = PrometheusBuilder::new().install_recorder()?;
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!("piyo_events_written_total", "Events accepted by write");
    metrics::describe_counter!("piyo_events_deleted_total", "Delete requests applied");
    metrics::describe_counter!("piyo_queries_total", "Range queries served");
    metrics::describe_counter!("piyo_compactions_total", "Completed WAL compactions");
    metrics::describe_histogram!("piyo_compaction_duration_seconds", "Time taken to compact the WAL");
    metrics::describe_gauge!("piyo_live_events", "Live events after the last compaction");

    metrics::gauge!("piyo_node_up", 1.0);
    Ok(())
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
