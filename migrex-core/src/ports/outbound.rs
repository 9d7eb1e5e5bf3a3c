use std::path::Path;

use async_trait::async_trait;

use migrex_model::{
    DeployedApp, Domain, InventoryId, MiddlewareHint, ProcessId, ProcessStatus,
    WorkItem,
};

use crate::Result;

/// Hands a finished assessment to the report renderer.
///
/// Fired once per run after the snapshot is written; rendering failures are
/// logged and never change the run's status.
#[async_trait]
pub trait ReportTrigger: Send + Sync {
    async fn fire(
        &self,
        item: &WorkItem,
        report_path: Option<&Path>,
        status: ProcessStatus,
        message: Option<&str>,
        report_eligible: bool,
    ) -> Result<()>;
}

/// Queue for assessments spawned by another assessment, such as middleware
/// found on a scanned server or applications hosted by scanned middleware.
#[async_trait]
pub trait FollowOnQueue: Send + Sync {
    async fn enqueue_middleware(&self, origin: &WorkItem, hint: &MiddlewareHint) -> Result<()>;

    async fn enqueue_application(&self, origin: &WorkItem, app: &DeployedApp) -> Result<()>;
}

/// Where in a run's lifecycle an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Started,
    Finished,
}

/// Lifecycle notification pushed to whoever is watching the queue.
#[derive(Debug, Clone)]
pub struct AssessmentEvent {
    pub process_id: ProcessId,
    pub inventory_id: InventoryId,
    pub domain: Domain,
    pub phase: EventPhase,
    pub status: ProcessStatus,
    pub message: Option<String>,
    /// Engine version, on middleware and database completions.
    pub engine_version: Option<String>,
    /// Merged instance count, on middleware and database completions.
    pub instance_count: Option<usize>,
}

/// Publisher for lifecycle events. Delivery is best-effort.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, event: AssessmentEvent);
}

/// Default publisher that surfaces events in the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationPublisher for TracingNotifier {
    async fn publish(&self, event: AssessmentEvent) {
        tracing::info!(
            process_id = %event.process_id,
            inventory_id = %event.inventory_id,
            domain = %event.domain,
            phase = ?event.phase,
            status = %event.status,
            "assessment event"
        );
    }
}
