//! Engine-port implementations that live at the service edge: the report
//! trigger (log-only; rendering is a downstream system) and the follow-on
//! queue feeding discovered work back through the intake channel.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use migrex_core::error::AssessError;
use migrex_core::ports::outbound::{FollowOnQueue, ReportTrigger};
use migrex_core::ports::store::ProcessStore;
use migrex_core::Result;
use migrex_model::{
    ApplicationTarget, DeployedApp, Domain, MiddlewareHint, MiddlewareTarget,
    ProcessId, ProcessStatus, WorkItem,
};
use tokio::sync::mpsc;

/// Issues process ids for work the engine creates itself (follow-on scans
/// and id-less submissions). Seeded from the wall clock so a restart does
/// not reissue ids that are still in flight upstream.
#[derive(Debug)]
pub struct ProcessIdAllocator {
    next: AtomicI64,
}

impl ProcessIdAllocator {
    pub fn new() -> Self {
        ProcessIdAllocator {
            next: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn next(&self) -> ProcessId {
        ProcessId::new(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ProcessIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Report rendering is a downstream consumer; the service records that the
/// trigger fired and moves on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportLogger;

#[async_trait]
impl ReportTrigger for ReportLogger {
    async fn fire(
        &self,
        item: &WorkItem,
        report_path: Option<&Path>,
        status: ProcessStatus,
        message: Option<&str>,
        report_eligible: bool,
    ) -> Result<()> {
        tracing::info!(
            process_id = %item.process_id,
            domain = %item.domain,
            status = %status,
            report_eligible,
            report_path = report_path.map(|p| p.display().to_string()).unwrap_or_default(),
            message = message.unwrap_or_default(),
            "assessment report ready"
        );
        Ok(())
    }
}

/// Feeds follow-on assessments back through the same intake path operator
/// submissions take: register the process row, then queue the item.
pub struct IntakeFollowOns {
    intake: mpsc::Sender<WorkItem>,
    processes: Arc<dyn ProcessStore>,
    ids: Arc<ProcessIdAllocator>,
}

impl IntakeFollowOns {
    pub fn new(
        intake: mpsc::Sender<WorkItem>,
        processes: Arc<dyn ProcessStore>,
        ids: Arc<ProcessIdAllocator>,
    ) -> Self {
        IntakeFollowOns {
            intake,
            processes,
            ids,
        }
    }

    async fn submit(&self, item: WorkItem) -> Result<()> {
        self.processes.register(&item).await?;
        tracing::info!(
            process_id = %item.process_id,
            domain = %item.domain,
            detail_type = %item.detail_type,
            "follow-on assessment queued"
        );
        self.intake
            .send(item)
            .await
            .map_err(|_| AssessError::Internal("intake queue closed".to_owned()))
    }
}

impl fmt::Debug for IntakeFollowOns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeFollowOns").finish_non_exhaustive()
    }
}

#[async_trait]
impl FollowOnQueue for IntakeFollowOns {
    async fn enqueue_middleware(&self, origin: &WorkItem, hint: &MiddlewareHint) -> Result<()> {
        let item = WorkItem {
            process_id: self.ids.next(),
            project_id: origin.project_id,
            inventory_id: origin.inventory_id,
            domain: Domain::Middleware,
            detail_type: hint.detail_type.clone(),
            version_hint: hint.version.clone(),
            connection: origin.connection.clone(),
            database: None,
            middleware: Some(MiddlewareTarget {
                engine_install_path: Some(hint.install_path.clone())
                    .filter(|path| !path.is_empty()),
                domain_home_path: None,
            }),
            application: None,
            submitted_at: Utc::now(),
        };
        self.submit(item).await
    }

    async fn enqueue_application(&self, origin: &WorkItem, app: &DeployedApp) -> Result<()> {
        let item = WorkItem {
            process_id: self.ids.next(),
            project_id: origin.project_id,
            inventory_id: origin.inventory_id,
            domain: Domain::Application,
            detail_type: packaging_code(&app.deploy_path),
            version_hint: None,
            connection: origin.connection.clone(),
            database: None,
            middleware: None,
            application: Some(ApplicationTarget {
                deploy_path: app.deploy_path.clone(),
                upload_source_path: None,
            }),
            submitted_at: Utc::now(),
        };
        self.submit(item).await
    }
}

/// Packaging code from the artifact extension. Exploded deployments and
/// unrecognized artifacts get the catch-all code; every java subtype
/// resolves the same analyzer anyway.
fn packaging_code(deploy_path: &str) -> String {
    let lower = deploy_path.to_ascii_lowercase();
    let code = if lower.ends_with(".ear") {
        "EAR"
    } else if lower.ends_with(".war") {
        "WAR"
    } else if lower.ends_with(".jar") {
        "JAR"
    } else {
        "ETC"
    };
    code.to_owned()
}
