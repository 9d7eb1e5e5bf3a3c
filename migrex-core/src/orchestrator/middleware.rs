//! Middleware assessment run.
//!
//! The engine scan resolves per detail type and major version; its merge
//! plan comes from a post-processor resolved the same way, so one engine
//! family can ship several version-specific planners. A connectivity
//! failure triggers the container probe before the run is written off as
//! failed: engines inside Docker are a policy case, not an error.

use chrono::Utc;
use migrex_model::{MiddlewareFinding, WorkItem};

use crate::cancel::CancelToken;
use crate::context::RunContext;
use crate::error::AssessError;
use crate::matrix;
use crate::merge::instance;
use crate::orchestrator::pipeline::{self, DomainOutcome, PipelineCore};
use crate::ports::runner::MiddlewarePostProcessor;
use crate::Result;

const NOT_SUPPORTED_MESSAGE: &str =
    "Scan cannot be performed. It is not supported Middleware.";
const UNSUPPORTED_VERSION_MESSAGE: &str =
    "Scan cannot be performed. It is an unsupported Middleware version.";
const VERSION_ADVISORY_MESSAGE: &str =
    "Not tested middleware version, some information may be missing.";
const CONTAINER_MESSAGE: &str =
    "Scan of middleware running as Docker containers is not yet supported.";

pub(crate) async fn run(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
) -> DomainOutcome {
    let mut finding = None;
    let mut outcome = DomainOutcome::default();
    if let Err(error) = drive(core, item, ctx, token, &mut finding, &mut outcome).await {
        tracing::error!(process_id = %item.process_id, %error, "middleware assessment failed");
        if is_connectivity_class(&error) && probe_container(core, item).await {
            ctx.mark_not_supported(CONTAINER_MESSAGE);
        } else {
            pipeline::apply_failure(ctx, &error);
        }
    }

    let payload = pipeline::snapshot_payload(item, finding.as_ref());
    pipeline::finalize(core, &core.locks.middleware, item, ctx, token, payload).await;
    pipeline::cleanup(core, item, ctx).await;
    outcome
}

async fn drive(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
    slot: &mut Option<MiddlewareFinding>,
    outcome: &mut DomainOutcome,
) -> Result<()> {
    let connection = pipeline::ensure_connection(core, item)?;

    let detail = item.detail_type_key();
    // ETC rows exist so operators can register engines nobody scans.
    if detail == "ETC" {
        return Err(AssessError::NotSupported(format!(
            "Inventory Detail Type Code({detail}) does not supported."
        )));
    }

    let runner = core
        .components
        .middlewares
        .resolve(&detail, item.version_hint.as_deref())
        .ok_or_else(|| AssessError::NotSupported(NOT_SUPPORTED_MESSAGE.to_owned()))?;

    let finding = slot.insert(runner.scan(&connection, item).await?);
    ctx.mark_report_eligible();
    outcome.engine_version = finding.engine_version.clone();

    let engine_version = finding.engine_version.clone().unwrap_or_default();
    if !matrix::middleware_supported(&detail, &engine_version) {
        ctx.push_message(VERSION_ADVISORY_MESSAGE);
    }

    core.inventory
        .update_middleware_engine(
            item.inventory_id,
            &engine_version,
            finding.java_vendor.as_deref().unwrap_or_default(),
            finding.java_version.as_deref().unwrap_or_default(),
        )
        .await?;

    // The scan ran, so the engine exists; no planner for its version means
    // the findings can be reported but not merged.
    let post = core
        .components
        .middleware_post
        .resolve(
            &detail,
            finding
                .engine_version
                .as_deref()
                .or(item.version_hint.as_deref()),
        )
        .ok_or_else(|| {
            AssessError::NotSupported(UNSUPPORTED_VERSION_MESSAGE.to_owned())
        })?;

    {
        let _domain = core.locks.middleware.lock().await;
        if token.is_cancelled() {
            tracing::info!(process_id = %item.process_id, "cancel observed before post-processing");
            ctx.mark_cancelled("");
            return Ok(());
        }
        match post_process(core, item, post.as_ref(), finding).await {
            Ok(merged) => outcome.instance_count = Some(merged),
            Err(error) => pipeline::note_post_processing_failure(ctx, item, &error),
        }
    }

    if finding.running_in_container {
        ctx.mark_not_supported(CONTAINER_MESSAGE);
        return Ok(());
    }

    pipeline::note_soft_errors(ctx, &finding.error_map);
    ctx.complete();
    Ok(())
}

/// Merges the post-processor's plan into the graph. Returns how many
/// instances were merged.
async fn post_process(
    core: &PipelineCore,
    item: &WorkItem,
    post: &dyn MiddlewarePostProcessor,
    finding: &MiddlewareFinding,
) -> Result<usize> {
    let plan = post.plan(item, finding)?;

    // Run users are re-decided per rescan; a user recorded for an instance
    // that since stopped must not survive.
    core.graph.clear_running_users(item.inventory_id).await?;

    let now = Utc::now();
    let mut merged = 0;
    for planned in &plan.instances {
        let persisted =
            instance::upsert_instance(core.graph.as_ref(), &planned.draft, now).await?;
        core.graph
            .upsert_middleware_runtime(persisted.id, &planned.runtime)
            .await?;
        core.graph
            .replace_interfaces(persisted.id, &planned.datasources)
            .await?;
        for draft in &planned.discovered_databases {
            instance::upsert_instance(core.graph.as_ref(), draft, now).await?;
        }
        merged += 1;

        queue_application_follow_ons(core, item, planned).await;
    }
    Ok(merged)
}

async fn queue_application_follow_ons(
    core: &PipelineCore,
    item: &WorkItem,
    planned: &crate::ports::runner::MiddlewareInstancePlan,
) {
    if !core.settings.application_auto_scan {
        return;
    }
    for app in &planned.deployed_apps {
        if let Err(error) = core.follow_on.enqueue_application(item, app).await {
            tracing::warn!(
                process_id = %item.process_id,
                app = %app.name,
                %error,
                "application follow-on enqueue failed"
            );
        }
    }
}

fn is_connectivity_class(error: &AssessError) -> bool {
    matches!(
        error,
        AssessError::Connection(_) | AssessError::Command(_) | AssessError::Insufficient(_)
    )
}

/// Looks for the engine process on the host and checks its cgroup for a
/// docker slice. Probe trouble reads as "not a container"; the original
/// failure stands in that case.
async fn probe_container(core: &PipelineCore, item: &WorkItem) -> bool {
    let connection = match core.resolver.resolve(item) {
        Ok(connection) => connection,
        Err(_) => return false,
    };

    let detail = item.detail_type_key();
    let install_path = item
        .middleware
        .as_ref()
        .and_then(|target| target.engine_install_path.as_deref())
        .map(str::trim)
        .filter(|path| !path.is_empty());

    let mut command = String::from("ps -e -o pid,cmd | grep -v grep");
    let pattern = match detail.as_str() {
        "APACHE" => Some(" | grep httpd"),
        "NGINX" => Some(" | grep 'nginx: master'"),
        "TOMCAT" => Some(" | grep java | grep tomcat"),
        _ => None,
    };
    if pattern.is_none() && install_path.is_none() {
        return false;
    }
    if let Some(pattern) = pattern {
        command.push_str(pattern);
    }
    if let Some(path) = install_path {
        command.push_str(" | grep ");
        command.push_str(path);
    }
    command.push_str(" | awk '{print $1}'");

    let pid = match core.executor.execute(&connection, &command).await {
        Ok(output) => output
            .stdout
            .lines()
            .next()
            .map(str::trim)
            .filter(|pid| !pid.is_empty())
            .map(str::to_owned),
        Err(error) => {
            tracing::debug!(process_id = %item.process_id, %error, "container probe failed");
            return false;
        }
    };
    let Some(pid) = pid else {
        return false;
    };

    match core
        .executor
        .execute(&connection, &format!("ps -e -o pid,cgroup | grep {pid}"))
        .await
    {
        Ok(output) => output.stdout.contains("docker"),
        Err(error) => {
            tracing::debug!(process_id = %item.process_id, %error, "cgroup probe failed");
            false
        }
    }
}
