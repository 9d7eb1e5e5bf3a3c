//! Monitoring feed ingestion.
//!
//! Agents post raw collector output as plain text. CPU, memory and disk
//! feeds aggregate into windowed statistics; network feeds additionally
//! discover peer servers, so they carry the project id for row creation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::errors::ApiResult;
use crate::state::AppState;
use migrex_model::{InventoryId, ProjectId};

#[derive(Debug, Deserialize)]
pub struct NetworkParams {
    pub project_id: i64,
}

/// `POST /api/monitoring/{inventory_id}/cpu`
pub async fn ingest_cpu(
    State(state): State<AppState>,
    Path(inventory_id): Path<i64>,
    feed: String,
) -> ApiResult<StatusCode> {
    state
        .metrics
        .ingest_cpu(InventoryId::new(inventory_id), &feed)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/monitoring/{inventory_id}/memory`
pub async fn ingest_memory(
    State(state): State<AppState>,
    Path(inventory_id): Path<i64>,
    feed: String,
) -> ApiResult<StatusCode> {
    state
        .metrics
        .ingest_memory(InventoryId::new(inventory_id), &feed)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/monitoring/{inventory_id}/disk`
pub async fn ingest_disk(
    State(state): State<AppState>,
    Path(inventory_id): Path<i64>,
    feed: String,
) -> ApiResult<StatusCode> {
    state
        .metrics
        .ingest_disk(InventoryId::new(inventory_id), &feed)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/monitoring/{inventory_id}/network?project_id=N`
pub async fn ingest_network(
    State(state): State<AppState>,
    Path(inventory_id): Path<i64>,
    Query(params): Query<NetworkParams>,
    feed: String,
) -> ApiResult<StatusCode> {
    state
        .network
        .ingest(
            ProjectId::new(params.project_id),
            InventoryId::new(inventory_id),
            &feed,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/monitoring/flush`: close out partial aggregation windows.
///
/// Normally windows close when a later sample crosses the boundary; this
/// lever exists for operators draining a project before report generation.
pub async fn flush_windows(
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    state.metrics.flush_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
