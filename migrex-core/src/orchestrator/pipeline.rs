//! Shared wiring and step helpers for the domain orchestrators.

use std::fmt;
use std::sync::Arc;

use migrex_model::{ConnectionDescriptor, ProcessStatus, WorkItem};
use tokio::sync::Mutex;

use crate::cancel::{CancelToken, CancellationRegistry};
use crate::committer::{classify_failure, Committer};
use crate::context::RunContext;
use crate::error::AssessError;
use crate::ports::outbound::{FollowOnQueue, NotificationPublisher, ReportTrigger};
use crate::ports::remote::{ConnectionResolver, RemoteExecutor};
use crate::ports::runner::{
    ApplicationScanRunner, DatabaseScanRunner, MiddlewarePostProcessor,
    MiddlewareScanRunner, ServerScanRunner,
};
use crate::ports::store::{GraphStore, InventoryStore, ProcessStore};
use crate::registry::ComponentRegistry;
use crate::settings::EngineSettings;
use crate::Result;

pub const INSUFFICIENT_CONNECTION_MESSAGE: &str =
    "Insufficient server connection information.";
pub const SOFT_ERROR_MESSAGE: &str =
    "An error occurred when executing some commands.";

/// Serializes post-processing and commit within each domain.
///
/// One run holds its domain lock through PostProcess, releases it, and takes
/// it again for Commit. The discovery lock is separate: monitoring ingestion
/// and server post-processing both create unknown-endpoint rows and must not
/// interleave.
#[derive(Debug, Default)]
pub struct DomainLocks {
    pub server: Mutex<()>,
    pub middleware: Mutex<()>,
    pub database: Mutex<()>,
    pub application: Mutex<()>,
    pub discovery: Mutex<()>,
}

/// Pluggable scan components, resolved per detail type and major version.
#[derive(Debug, Default)]
pub struct ScanComponents {
    pub servers: ComponentRegistry<dyn ServerScanRunner>,
    pub middlewares: ComponentRegistry<dyn MiddlewareScanRunner>,
    pub databases: ComponentRegistry<dyn DatabaseScanRunner>,
    pub applications: ComponentRegistry<dyn ApplicationScanRunner>,
    pub middleware_post: ComponentRegistry<dyn MiddlewarePostProcessor>,
}

/// Everything a domain run needs: components, ports, stores, locks.
///
/// Built once at startup and shared; the registries are immutable after
/// wiring so the whole core is `Sync` without interior locking beyond the
/// domain mutexes.
pub struct PipelineCore {
    pub settings: EngineSettings,
    pub components: ScanComponents,
    pub executor: Arc<dyn RemoteExecutor>,
    pub resolver: Arc<dyn ConnectionResolver>,
    pub graph: Arc<dyn GraphStore>,
    pub processes: Arc<dyn ProcessStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub committer: Committer,
    pub follow_on: Arc<dyn FollowOnQueue>,
    pub notifier: Arc<dyn NotificationPublisher>,
    pub cancellations: CancellationRegistry,
    pub locks: Arc<DomainLocks>,
}

impl PipelineCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: EngineSettings,
        components: ScanComponents,
        executor: Arc<dyn RemoteExecutor>,
        resolver: Arc<dyn ConnectionResolver>,
        graph: Arc<dyn GraphStore>,
        processes: Arc<dyn ProcessStore>,
        inventory: Arc<dyn InventoryStore>,
        report_trigger: Arc<dyn ReportTrigger>,
        follow_on: Arc<dyn FollowOnQueue>,
        notifier: Arc<dyn NotificationPublisher>,
    ) -> Self {
        let committer = Committer::new(
            Arc::clone(&processes),
            report_trigger,
            settings.work_dir.clone(),
        );
        PipelineCore {
            settings,
            components,
            executor,
            resolver,
            graph,
            processes,
            inventory,
            committer,
            follow_on,
            notifier,
            cancellations: CancellationRegistry::new(),
            locks: Arc::new(DomainLocks::default()),
        }
    }
}

impl fmt::Debug for PipelineCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineCore")
            .field("settings", &self.settings)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

/// What a finished run reports upward for the completion notification.
#[derive(Debug, Clone, Default)]
pub struct DomainOutcome {
    /// Engine version, filled by middleware and database runs.
    pub engine_version: Option<String>,
    /// Count of merged discovered instances, same two domains.
    pub instance_count: Option<usize>,
}

/// Resolves and validates the connection material for a work item.
///
/// A scan needs an address, an account and at least one secret (password or
/// key file); anything less fails before touching the target.
pub(crate) fn ensure_connection(
    core: &PipelineCore,
    item: &WorkItem,
) -> Result<ConnectionDescriptor> {
    let connection = core.resolver.resolve(item)?;
    let valid = !connection.ip_address.trim().is_empty()
        && !connection.username_or_empty().trim().is_empty()
        && connection.has_secret();
    if !valid {
        return Err(AssessError::Insufficient(
            INSUFFICIENT_CONNECTION_MESSAGE.to_owned(),
        ));
    }
    Ok(connection)
}

/// Applies a fatal pipeline error to the run context. The classified message
/// appends after whatever advisories accumulated before the failure.
pub(crate) fn apply_failure(ctx: &mut RunContext, error: &AssessError) {
    let (status, message) = classify_failure(error);
    match status {
        ProcessStatus::NotSupported => ctx.mark_not_supported(message),
        ProcessStatus::Cancelled => ctx.mark_cancelled(message),
        _ => ctx.mark_failed(message),
    }
}

/// Caught post-processing failure: the findings stand, the run downgrades.
pub(crate) fn note_post_processing_failure(
    ctx: &mut RunContext,
    item: &WorkItem,
    error: &AssessError,
) {
    tracing::error!(
        process_id = %item.process_id,
        domain = %item.domain,
        %error,
        "post-processing failed"
    );
    ctx.downgrade_partial();
    ctx.push_message(format!("Post processing failed. [Reason] {}", error.detail()));
}

/// Non-empty soft-error map downgrades a run that otherwise completed.
pub(crate) fn note_soft_errors(
    ctx: &mut RunContext,
    errors: &std::collections::BTreeMap<String, String>,
) {
    if !errors.is_empty() {
        ctx.downgrade_partial();
        ctx.push_message(SOFT_ERROR_MESSAGE);
    }
}

/// Serializes a finding for the commit snapshot. A finding that cannot
/// serialize loses its snapshot but nothing else.
pub(crate) fn snapshot_payload<T: serde::Serialize>(
    item: &WorkItem,
    finding: Option<&T>,
) -> Option<serde_json::Value> {
    let finding = finding?;
    match serde_json::to_value(finding) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(process_id = %item.process_id, %error, "finding serialization failed");
            None
        }
    }
}

/// Commit checkpoint. Takes the domain lock, honors a pending cancel request
/// (the cancel route already persisted the status, so nothing is written
/// here), otherwise hands the run to the committer.
pub(crate) async fn finalize(
    core: &PipelineCore,
    lock: &Mutex<()>,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
    payload: Option<serde_json::Value>,
) {
    let _domain = lock.lock().await;
    if token.is_cancelled() {
        tracing::info!(process_id = %item.process_id, "cancel observed before commit");
        ctx.mark_cancelled("");
        return;
    }
    core.committer.commit(item, ctx, payload).await;
}

/// Best-effort workspace removal. A run that produced a snapshot keeps its
/// directory; the persisted report path must stay resolvable.
pub(crate) async fn cleanup(core: &PipelineCore, item: &WorkItem, ctx: &RunContext) {
    if ctx.is_report_eligible() {
        return;
    }
    let dir = core.committer.process_dir(item.process_id);
    if let Err(error) = tokio::fs::remove_dir_all(&dir).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                process_id = %item.process_id,
                path = %dir.display(),
                %error,
                "scan workspace removal failed"
            );
        }
    }
}
