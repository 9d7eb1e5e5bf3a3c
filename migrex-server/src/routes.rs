//! Route table for the assessment service.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{assessment_handlers, monitoring_handlers};

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/assessments",
            post(assessment_handlers::submit_assessment),
        )
        .route(
            "/api/assessments/{process_id}",
            get(assessment_handlers::get_assessment)
                .delete(assessment_handlers::cancel_assessment),
        )
        .route(
            "/api/monitoring/{inventory_id}/cpu",
            post(monitoring_handlers::ingest_cpu),
        )
        .route(
            "/api/monitoring/{inventory_id}/memory",
            post(monitoring_handlers::ingest_memory),
        )
        .route(
            "/api/monitoring/{inventory_id}/disk",
            post(monitoring_handlers::ingest_disk),
        )
        .route(
            "/api/monitoring/{inventory_id}/network",
            post(monitoring_handlers::ingest_network),
        )
        .route(
            "/api/monitoring/flush",
            post(monitoring_handlers::flush_windows),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
