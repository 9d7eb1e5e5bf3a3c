//! Intake API: submit, inspect, and cancel assessment runs.
//!
//! Submission only validates and queues; the worker pool picks the item up
//! and drives it through the engine. Cancellation flips the shared registry
//! flag and persists the terminal row itself, because a run that is still
//! pending has no dispatcher writing on its behalf.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::{ApiError, ApiResult};
use crate::state::AppState;
use migrex_model::{
    ApplicationTarget, ConnectionDescriptor, DatabaseTarget, Domain,
    InventoryId, MiddlewareTarget, ProcessId, ProcessRecord, ProcessStatus,
    ProjectId, Secret, WorkItem,
};

/// Body of `POST /api/assessments`.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Upstream-assigned process id; allocated locally when absent.
    #[serde(default)]
    pub process_id: Option<i64>,
    pub project_id: i64,
    pub inventory_id: i64,
    /// Domain code: `SVR`, `MW`, `DBMS` or `APP`.
    pub domain: String,
    /// Detail type code, e.g. `LINUX`, `TOMCAT`, `ORACLE`, `WAR`.
    pub detail_type: String,
    #[serde(default)]
    pub version_hint: Option<String>,
    pub connection: ConnectionRequest,
    #[serde(default)]
    pub database: Option<DatabaseRequest>,
    #[serde(default)]
    pub middleware: Option<MiddlewareRequest>,
    #[serde(default)]
    pub application: Option<ApplicationRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    pub ip_address: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    /// Held only for the duration of the run, never persisted.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub key_file: Option<String>,
    #[serde(default)]
    pub windows: bool,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseRequest {
    pub service_name: String,
}

#[derive(Debug, Deserialize)]
pub struct MiddlewareRequest {
    #[serde(default)]
    pub engine_install_path: Option<String>,
    #[serde(default)]
    pub domain_home_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationRequest {
    pub deploy_path: String,
    #[serde(default)]
    pub upload_source_path: Option<String>,
}

impl SubmitRequest {
    fn into_work_item(self, process_id: ProcessId) -> Result<WorkItem, ApiError> {
        let domain = Domain::from_code(&self.domain).map_err(|_| {
            ApiError::bad_request(format!("unknown domain code: {}", self.domain))
        })?;
        Ok(WorkItem {
            process_id,
            project_id: ProjectId::new(self.project_id),
            inventory_id: InventoryId::new(self.inventory_id),
            domain,
            detail_type: self.detail_type,
            version_hint: self.version_hint,
            connection: ConnectionDescriptor {
                ip_address: self.connection.ip_address,
                port: self.connection.port,
                username: self.connection.username,
                password: self.connection.password.map(Secret::new),
                key_file: self.connection.key_file,
                windows: self.connection.windows,
            },
            database: self.database.map(|db| DatabaseTarget {
                service_name: db.service_name,
            }),
            middleware: self.middleware.map(|mw| MiddlewareTarget {
                engine_install_path: mw.engine_install_path,
                domain_home_path: mw.domain_home_path,
            }),
            application: self.application.map(|app| ApplicationTarget {
                deploy_path: app.deploy_path,
                upload_source_path: app.upload_source_path,
            }),
            submitted_at: Utc::now(),
        })
    }
}

/// Wire view of a process row. Codes instead of enum names, matching what
/// inventory systems upstream expect back.
#[derive(Debug, Serialize)]
pub struct ProcessView {
    pub process_id: i64,
    pub project_id: i64,
    pub inventory_id: i64,
    pub domain: &'static str,
    pub detail_type: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    pub report_eligible: bool,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<ProcessRecord> for ProcessView {
    fn from(record: ProcessRecord) -> Self {
        Self {
            process_id: record.process_id.as_i64(),
            project_id: record.project_id.as_i64(),
            inventory_id: record.inventory_id.as_i64(),
            domain: record.domain.as_code(),
            detail_type: record.detail_type,
            status: record.status.as_code(),
            message: record.message,
            report_path: record.report_path,
            report_eligible: record.report_eligible,
            submitted_at: record.submitted_at,
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }
}

/// `POST /api/assessments`: register the run and hand it to the worker pool.
pub async fn submit_assessment(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let process_id = match request.process_id {
        Some(raw) => {
            let id = ProcessId::new(raw);
            if let Some(existing) = state.processes.fetch(id).await? {
                return Err(ApiError::conflict(format!(
                    "assessment {id} already exists with status {}",
                    existing.status
                )));
            }
            id
        }
        None => state.ids.next(),
    };

    let item = request.into_work_item(process_id)?;
    state.processes.register(&item).await?;
    state
        .intake
        .send(item)
        .await
        .map_err(|_| ApiError::internal("intake queue closed"))?;

    info!(process_id = %process_id, "assessment accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "process_id": process_id.as_i64(),
            "status": ProcessStatus::Pending.as_code(),
        })),
    ))
}

/// `GET /api/assessments/{process_id}`.
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(process_id): Path<i64>,
) -> ApiResult<Json<ProcessView>> {
    let record = state
        .processes
        .fetch(ProcessId::new(process_id))
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("no assessment {process_id}"))
        })?;
    Ok(Json(ProcessView::from(record)))
}

/// `DELETE /api/assessments/{process_id}`: request cancellation.
///
/// The dispatcher honors the flag at its checkpoints; a run that already
/// reached a terminal status cannot be cancelled after the fact.
pub async fn cancel_assessment(
    State(state): State<AppState>,
    Path(process_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let id = ProcessId::new(process_id);
    let record = state.processes.fetch(id).await?.ok_or_else(|| {
        ApiError::not_found(format!("no assessment {process_id}"))
    })?;
    if record.status.is_terminal() {
        return Err(ApiError::conflict(format!(
            "assessment {process_id} already finished with status {}",
            record.status
        )));
    }

    state.dispatcher.core().cancellations.request_cancel(id);
    state
        .processes
        .update_status(id, ProcessStatus::Cancelled, Utc::now())
        .await?;

    info!(process_id = %id, "assessment cancelled");
    Ok(Json(json!({
        "process_id": process_id,
        "status": ProcessStatus::Cancelled.as_code(),
    })))
}
