//! Server assessment run.
//!
//! A server scan feeds three consumers: the inventory profile tables
//! (rewritten wholesale), the discovery graph (databases betrayed by the
//! process table), and the follow-on queue (middleware installations worth
//! their own scan).

use chrono::Utc;
use migrex_model::{ServerFinding, WorkItem};

use crate::cancel::CancelToken;
use crate::context::RunContext;
use crate::error::AssessError;
use crate::matrix;
use crate::merge::unknown_database;
use crate::orchestrator::pipeline::{self, DomainOutcome, PipelineCore};
use crate::Result;

const NOT_SUPPORTED_MESSAGE: &str =
    "Scan cannot be performed. It is not supported OS.";
const VERSION_ADVISORY_MESSAGE: &str =
    "Not tested OS version, some information may be missing.";
const NO_ADMIN_MESSAGE: &str = "User haven't administrator privileges.";

pub(crate) async fn run(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
) -> DomainOutcome {
    let mut finding = None;
    if let Err(error) = drive(core, item, ctx, token, &mut finding).await {
        tracing::error!(process_id = %item.process_id, %error, "server assessment failed");
        pipeline::apply_failure(ctx, &error);
    }

    let payload = pipeline::snapshot_payload(item, finding.as_ref());
    pipeline::finalize(core, &core.locks.server, item, ctx, token, payload).await;
    pipeline::cleanup(core, item, ctx).await;
    DomainOutcome::default()
}

async fn drive(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
    slot: &mut Option<ServerFinding>,
) -> Result<()> {
    let connection = pipeline::ensure_connection(core, item)?;
    let runner = core
        .components
        .servers
        .resolve(&item.detail_type_key(), item.version_hint.as_deref())
        .ok_or_else(|| AssessError::NotSupported(NOT_SUPPORTED_MESSAGE.to_owned()))?;

    let finding = slot.insert(runner.scan(&connection, item).await?);
    ctx.mark_report_eligible();

    if !matrix::os_supported(&finding.os_family, &finding.os_version) {
        ctx.push_message(VERSION_ADVISORY_MESSAGE);
    }

    {
        let _domain = core.locks.server.lock().await;
        if token.is_cancelled() {
            tracing::info!(process_id = %item.process_id, "cancel observed before post-processing");
            ctx.mark_cancelled("");
            return Ok(());
        }
        if let Err(error) = post_process(core, item, finding).await {
            pipeline::note_post_processing_failure(ctx, item, &error);
        }
    }

    // Probed outside the lock; a transport failure here is fatal but the
    // latched findings still commit.
    if !core.executor.probe_admin(&connection).await? {
        ctx.downgrade_partial();
        ctx.push_message(NO_ADMIN_MESSAGE);
    }

    pipeline::note_soft_errors(ctx, &finding.error_map);
    ctx.complete();

    queue_middleware_follow_ons(core, item, finding).await;
    Ok(())
}

/// Profile rewrite, resource status upsert, unknown-database discovery.
/// Runs under the server lock; the discovery rows additionally take the
/// discovery lock shared with monitoring ingestion.
async fn post_process(
    core: &PipelineCore,
    item: &WorkItem,
    finding: &ServerFinding,
) -> Result<()> {
    core.inventory
        .replace_server_profile(item.inventory_id, finding)
        .await?;
    core.inventory
        .upsert_server_status(
            item.inventory_id,
            finding.cpu_usage_percent,
            finding.memory_usage_percent,
            Utc::now(),
        )
        .await?;

    {
        let _discovery = core.locks.discovery.lock().await;
        let created = unknown_database::discover(
            core.graph.as_ref(),
            core.inventory.as_ref(),
            item,
            finding,
        )
        .await?;
        if created > 0 {
            tracing::info!(
                process_id = %item.process_id,
                created,
                "unregistered databases discovered"
            );
        }
    }
    Ok(())
}

/// Queues follow-on assessments for middleware noticed on the server.
/// Queue trouble never touches the run result.
async fn queue_middleware_follow_ons(
    core: &PipelineCore,
    item: &WorkItem,
    finding: &ServerFinding,
) {
    if !core.settings.middleware_auto_scan || finding.middleware_hints.is_empty() {
        return;
    }
    for hint in &finding.middleware_hints {
        if let Err(error) = core.follow_on.enqueue_middleware(item, hint).await {
            tracing::warn!(
                process_id = %item.process_id,
                detail_type = %hint.detail_type,
                %error,
                "middleware follow-on enqueue failed"
            );
        }
    }
}
