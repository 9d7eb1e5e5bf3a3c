//! Database assessment run.
//!
//! The engine is queried over its own protocol, so the work item's
//! connection descriptor addresses the engine itself. Every reported schema
//! becomes a discovered instance keyed `"{port}|{schema}"`, carrying its
//! object census and the engine's DB links as interfaces.

use chrono::Utc;
use migrex_model::{
    DatabaseFinding, Domain, Endpoint, InstanceDraft, InstanceKey, InterfaceKind,
    RegistrationOrigin, SchemaCensus, WorkItem,
};

use crate::cancel::CancelToken;
use crate::context::RunContext;
use crate::error::AssessError;
use crate::matrix;
use crate::merge::instance;
use crate::merge::interface::{self, InterfaceDraft};
use crate::orchestrator::pipeline::{self, DomainOutcome, PipelineCore};
use crate::Result;

const NOT_SUPPORTED_MESSAGE: &str =
    "Scan cannot be performed. It is not supported Database.";
const VERSION_ADVISORY_MESSAGE: &str =
    "Not tested database version, some information may be missing.";

pub(crate) async fn run(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
) -> DomainOutcome {
    let mut finding = None;
    let mut outcome = DomainOutcome::default();
    if let Err(error) = drive(core, item, ctx, token, &mut finding, &mut outcome).await {
        tracing::error!(process_id = %item.process_id, %error, "database assessment failed");
        pipeline::apply_failure(ctx, &error);
    }

    let payload = pipeline::snapshot_payload(item, finding.as_ref());
    pipeline::finalize(core, &core.locks.database, item, ctx, token, payload).await;
    pipeline::cleanup(core, item, ctx).await;
    outcome
}

async fn drive(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
    slot: &mut Option<DatabaseFinding>,
    outcome: &mut DomainOutcome,
) -> Result<()> {
    pipeline::ensure_connection(core, item)?;

    let detail = item.detail_type_key();
    let runner = core
        .components
        .databases
        .resolve(&detail, None)
        .ok_or_else(|| AssessError::NotSupported(NOT_SUPPORTED_MESSAGE.to_owned()))?;

    let finding = slot.insert(runner.scan(item).await?);
    ctx.mark_report_eligible();
    outcome.engine_version = finding.engine_version.clone();

    let engine_version = finding.engine_version.clone().unwrap_or_default();
    if !matrix::database_supported(&detail, &engine_version) {
        ctx.push_message(VERSION_ADVISORY_MESSAGE);
    }

    {
        let _domain = core.locks.database.lock().await;
        if token.is_cancelled() {
            tracing::info!(process_id = %item.process_id, "cancel observed before post-processing");
            ctx.mark_cancelled("");
            return Ok(());
        }
        match post_process(core, item, finding).await {
            Ok(merged) => outcome.instance_count = Some(merged),
            Err(error) => pipeline::note_post_processing_failure(ctx, item, &error),
        }
    }

    pipeline::note_soft_errors(ctx, &finding.error_map);
    ctx.complete();
    Ok(())
}

/// Engine backfill, per-schema instance merge, census and DB-link rewrite.
/// Returns how many schema instances were merged.
async fn post_process(
    core: &PipelineCore,
    item: &WorkItem,
    finding: &DatabaseFinding,
) -> Result<usize> {
    // Unlike middleware, the census version always wins; the engine itself
    // reported it.
    core.inventory
        .update_database_engine(
            item.inventory_id,
            finding.engine_version.as_deref().unwrap_or_default(),
        )
        .await?;

    let links = link_interfaces(&finding.db_links);
    let port = item.connection.port.unwrap_or(0);
    let now = Utc::now();

    let mut merged = 0;
    for schema in &finding.schemas {
        let draft = InstanceDraft {
            key: InstanceKey::new(
                item.project_id,
                item.connection.ip_address.clone(),
                format!("{port}|{}", schema.name),
            ),
            domain: Domain::Database,
            detail_type: item.detail_type_key(),
            name: Some(schema.name.clone()),
            vendor: None,
            version: finding.engine_version.clone(),
            origin: Some(RegistrationOrigin::Inventory),
            owner_inventory_id: Some(item.inventory_id),
            finder_inventory_id: Some(item.inventory_id),
            touched_by: Some(item.process_id),
        };
        let persisted =
            instance::upsert_instance(core.graph.as_ref(), &draft, now).await?;
        core.graph
            .upsert_schema_census(
                persisted.id,
                &SchemaCensus {
                    table_count: schema.table_count,
                    view_count: schema.view_count,
                    procedure_count: schema.procedure_count,
                },
            )
            .await?;
        // Links are engine-wide, so every schema instance carries the set.
        core.graph.replace_interfaces(persisted.id, &links).await?;
        merged += 1;
    }
    Ok(merged)
}

fn link_interfaces(
    links: &[migrex_model::DbLinkFinding],
) -> Vec<migrex_model::InterfaceSpec> {
    let drafts = links
        .iter()
        .map(|link| InterfaceDraft {
            kind: InterfaceKind::DbLink,
            name: link.name.clone(),
            descriptors: vec![link_descriptor(link)],
            endpoints: if link.host.is_empty() {
                Vec::new()
            } else {
                vec![Endpoint {
                    ip_address: link.host.clone(),
                    port: link.port.unwrap_or(0),
                    service_name: link.service_name.clone(),
                    username: None,
                }]
            },
        })
        .collect();
    interface::finalize_interfaces(drafts)
}

fn link_descriptor(link: &migrex_model::DbLinkFinding) -> String {
    let mut descriptor = link.name.clone();
    if !link.host.is_empty() {
        descriptor.push('@');
        descriptor.push_str(&link.host);
        if let Some(port) = link.port {
            descriptor.push(':');
            descriptor.push_str(&port.to_string());
        }
        if let Some(service) = link.service_name.as_deref().filter(|s| !s.is_empty()) {
            descriptor.push('/');
            descriptor.push_str(service);
        }
    }
    descriptor
}
