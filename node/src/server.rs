// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use piyo::{Event, Select, Store};
use tower_http::trace::TraceLayer;

use crate::api::{DeleteEventResponse, QueryParams, WriteEventResponse};
use crate::errors::ApiError;

pub type SharedStore = Arc<dyn Store>;

pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/event", post(write_event))
        .route("/event/:id", delete(delete_event))
        .route("/query", get(query_events))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Store calls may block on file I/O, so they leave the async workers.
async fn blocking<T, F>(store: SharedStore, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn Store) -> piyo::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn write_event(
    State(store): State<SharedStore>,
    Json(event): Json<Event>,
) -> Result<Json<WriteEventResponse>, ApiError> {
    let id = event.effective_id();
    let entry = event.to_string();
    blocking(store, move |s| s.write(event)).await?;

    metrics::increment_counter!("piyo_events_written_total");
    tracing::debug!(%id, "Event written");
    Ok(Json(WriteEventResponse { id, entry }))
}

async fn delete_event(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<DeleteEventResponse>, ApiError> {
    let target = id.clone();
    blocking(store, move |s| s.delete(&target)).await?;

    metrics::increment_counter!("piyo_events_deleted_total");
    tracing::debug!(%id, "Event deleted");
    Ok(Json(DeleteEventResponse { id }))
}

async fn query_events(
    State(store): State<SharedStore>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let (from, to) = params.bounds()?;
    let select = Select::parse(params.who.as_deref(), params.category.as_deref());

    let events = blocking(store, move |s| s.read(from, to)).await?;
    let events = if select.is_empty() {
        events
    } else {
        select.filter(&events)
    };

    metrics::increment_counter!("piyo_queries_total");
    Ok(Json(events))
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
