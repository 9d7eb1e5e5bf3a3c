//! Entry point worker loops hand work items to.

use std::sync::Arc;

use chrono::Utc;
use migrex_model::{Domain, ProcessStatus, WorkItem};
use tracing::Instrument;

use crate::context::RunContext;
use crate::orchestrator::pipeline::{DomainOutcome, PipelineCore};
use crate::orchestrator::{application, database, middleware, server};
use crate::ports::outbound::{AssessmentEvent, EventPhase};

/// Runs one assessment end to end: lifecycle bookkeeping, the domain
/// pipeline, and the start/finish notifications around it.
///
/// Cancellation is cooperative. A request that lands before the run starts
/// skips it entirely; afterwards the pipeline checkpoints decide. The cancel
/// request itself already persisted the `Cancelled` status, so a cancelled
/// run never writes a final status of its own.
#[derive(Debug, Clone)]
pub struct WorkDispatcher {
    core: Arc<PipelineCore>,
}

impl WorkDispatcher {
    pub fn new(core: Arc<PipelineCore>) -> Self {
        WorkDispatcher { core }
    }

    pub fn core(&self) -> &Arc<PipelineCore> {
        &self.core
    }

    /// Dispatches one work item and returns the status the run finished
    /// with. The registry entry for the process id is cleared on the way
    /// out, so a later run reusing the id starts clean.
    pub async fn dispatch(&self, item: &WorkItem) -> ProcessStatus {
        let token = self.core.cancellations.token(item.process_id);

        if token.is_cancelled() {
            tracing::info!(
                process_id = %item.process_id,
                domain = %item.domain,
                "cancelled before start, skipping"
            );
            if let Err(error) = self
                .core
                .processes
                .update_status(item.process_id, ProcessStatus::Cancelled, Utc::now())
                .await
            {
                tracing::error!(process_id = %item.process_id, %error, "status update failed");
            }
            self.publish(item, EventPhase::Finished, ProcessStatus::Cancelled, None, None)
                .await;
            self.core.cancellations.clear(item.process_id);
            return ProcessStatus::Cancelled;
        }

        if let Err(error) = self
            .core
            .processes
            .mark_in_progress(item.process_id, Utc::now())
            .await
        {
            tracing::warn!(process_id = %item.process_id, %error, "start stamp failed");
        }
        self.publish(item, EventPhase::Started, ProcessStatus::InProgress, None, None)
            .await;

        tracing::info!(
            process_id = %item.process_id,
            inventory_id = %item.inventory_id,
            domain = %item.domain,
            detail_type = %item.detail_type,
            "assessment started"
        );

        let mut ctx = RunContext::new();
        let span = tracing::info_span!(
            "assessment",
            run_id = %ctx.run_id(),
            process_id = %item.process_id,
        );
        let outcome = async {
            match item.domain {
                Domain::Server => server::run(&self.core, item, &mut ctx, &token).await,
                Domain::Middleware => middleware::run(&self.core, item, &mut ctx, &token).await,
                Domain::Database => database::run(&self.core, item, &mut ctx, &token).await,
                Domain::Application => application::run(&self.core, item, &mut ctx, &token).await,
            }
        }
        .instrument(span)
        .await;

        let status = if token.is_cancelled() {
            ProcessStatus::Cancelled
        } else {
            let status = ctx.status();
            if let Err(error) = self
                .core
                .processes
                .update_status(item.process_id, status, Utc::now())
                .await
            {
                tracing::error!(process_id = %item.process_id, %error, "status update failed");
            }
            status
        };

        tracing::info!(
            process_id = %item.process_id,
            domain = %item.domain,
            status = %status,
            "assessment finished"
        );
        self.publish(item, EventPhase::Finished, status, ctx.message(), Some(&outcome))
            .await;
        self.core.cancellations.clear(item.process_id);
        status
    }

    async fn publish(
        &self,
        item: &WorkItem,
        phase: EventPhase,
        status: ProcessStatus,
        message: Option<String>,
        outcome: Option<&DomainOutcome>,
    ) {
        self.core
            .notifier
            .publish(AssessmentEvent {
                process_id: item.process_id,
                inventory_id: item.inventory_id,
                domain: item.domain,
                phase,
                status,
                message,
                engine_version: outcome.and_then(|o| o.engine_version.clone()),
                instance_count: outcome.and_then(|o| o.instance_count),
            })
            .await;
    }
}
