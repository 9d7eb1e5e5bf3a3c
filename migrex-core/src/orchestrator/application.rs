//! Application assessment run.
//!
//! The analyzer unpacks the artifact into the process workspace and reports
//! what it found; post-processing turns that into the inventory backfill
//! (packaging subtype, framework, https usage), the hard-coded IP table and
//! the datasource slice of the discovery graph.

use chrono::Utc;
use migrex_model::{
    ApplicationFinding, ApplicationProfile, Domain, Endpoint, HardCodedIp,
    InstanceDraft, InstanceKey, InterfaceKind, InterfaceSpec, PackagingKind,
    RegistrationOrigin, WorkItem,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cancel::CancelToken;
use crate::context::RunContext;
use crate::error::AssessError;
use crate::merge::interface::{self, InterfaceDraft};
use crate::merge::{instance, jdbc, text};
use crate::orchestrator::pipeline::{self, DomainOutcome, PipelineCore};
use crate::Result;

const NOT_SUPPORTED_MESSAGE: &str =
    "Scan cannot be performed. It is not supported Application.";

/// Framework jars checked for, in priority order: eGovFrame wraps Spring,
/// Spring Boot wraps Spring Core, so the most specific marker must win.
static FRAMEWORK_JAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(org\.egovframe\.rte\..*|spring-boot-\d+(\.\d+)*|spring-core-\d+(\.\d+)*)\.jar$",
    )
    .unwrap()
});

pub(crate) async fn run(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
) -> DomainOutcome {
    let mut finding = None;
    if let Err(error) = drive(core, item, ctx, token, &mut finding).await {
        tracing::error!(process_id = %item.process_id, %error, "application assessment failed");
        pipeline::apply_failure(ctx, &error);
    }

    let payload = pipeline::snapshot_payload(item, finding.as_ref());
    pipeline::finalize(core, &core.locks.application, item, ctx, token, payload).await;
    cleanup_analysis_dir(item, finding.as_ref()).await;
    pipeline::cleanup(core, item, ctx).await;
    DomainOutcome::default()
}

async fn drive(
    core: &PipelineCore,
    item: &WorkItem,
    ctx: &mut RunContext,
    token: &CancelToken,
    slot: &mut Option<ApplicationFinding>,
) -> Result<()> {
    let connection = pipeline::ensure_connection(core, item)?;
    let runner = core
        .components
        .applications
        .resolve(&runner_key(&item.detail_type_key()), None)
        .ok_or_else(|| AssessError::NotSupported(NOT_SUPPORTED_MESSAGE.to_owned()))?;

    let work_dir = core.committer.process_dir(item.process_id);
    let finding = slot.insert(runner.scan(&connection, item, &work_dir).await?);
    ctx.mark_report_eligible();

    {
        let _domain = core.locks.application.lock().await;
        if token.is_cancelled() {
            tracing::info!(process_id = %item.process_id, "cancel observed before post-processing");
            ctx.mark_cancelled("");
            return Ok(());
        }
        if let Err(error) = post_process(core, item, finding).await {
            pipeline::note_post_processing_failure(ctx, item, &error);
        }
    }

    pipeline::note_soft_errors(ctx, &finding.error_map);
    ctx.complete();
    Ok(())
}

/// Every packaging subtype resolves the java analyzer; the registry key is
/// the implementation language, not the artifact shape.
fn runner_key(detail: &str) -> String {
    match detail {
        "EAR" | "WAR" | "JAR" | "ETC" => "JAVA".to_owned(),
        other => other.to_owned(),
    }
}

async fn post_process(
    core: &PipelineCore,
    item: &WorkItem,
    finding: &ApplicationFinding,
) -> Result<()> {
    core.inventory
        .update_application_profile(item.inventory_id, &build_profile(finding))
        .await?;

    let rows: Vec<HardCodedIp> = finding
        .hard_coded_ips
        .iter()
        .map(|found| HardCodedIp {
            application_inventory_id: item.inventory_id,
            file_path: base_name(&found.file_path).to_owned(),
            line_number: found.line_number,
            ip_address: found.ip_address.clone(),
            port: found.port,
        })
        .collect();
    core.graph
        .replace_hard_coded_ips(item.inventory_id, &rows)
        .await?;

    merge_datasources(core, item, finding).await
}

/// The application's own graph instance plus whatever its JDBC descriptors
/// betray about databases.
async fn merge_datasources(
    core: &PipelineCore,
    item: &WorkItem,
    finding: &ApplicationFinding,
) -> Result<()> {
    let deploy_path = item
        .application
        .as_ref()
        .map(|target| target.deploy_path.clone())
        .unwrap_or_default();

    let now = Utc::now();
    let app_draft = InstanceDraft {
        key: InstanceKey::new(item.project_id, item.connection.ip_address.clone(), deploy_path),
        domain: Domain::Application,
        detail_type: item.detail_type_key(),
        name: None,
        vendor: None,
        version: None,
        origin: Some(RegistrationOrigin::Inventory),
        owner_inventory_id: Some(item.inventory_id),
        finder_inventory_id: Some(item.inventory_id),
        touched_by: Some(item.process_id),
    };
    let app_instance =
        instance::upsert_instance(core.graph.as_ref(), &app_draft, now).await?;

    let (interfaces, databases) = datasource_plan(item, &finding.jdbc_urls);
    core.graph
        .replace_interfaces(app_instance.id, &interfaces)
        .await?;
    for draft in &databases {
        instance::upsert_instance(core.graph.as_ref(), draft, now).await?;
    }
    Ok(())
}

/// Resolves raw JDBC descriptors into interface rows for the application
/// instance and discovered-database drafts, deduplicated across descriptors.
fn datasource_plan(
    item: &WorkItem,
    jdbc_urls: &[String],
) -> (Vec<InterfaceSpec>, Vec<InstanceDraft>) {
    let mut interface_drafts = Vec::new();
    let mut database_drafts = Vec::new();
    let mut seen_databases = std::collections::HashSet::new();

    for url in jdbc_urls {
        let endpoints = jdbc::parse(url);
        if endpoints.is_empty() {
            continue;
        }

        for endpoint in &endpoints {
            if endpoint.host.is_empty() || text::is_garbage_host(&endpoint.host) {
                continue;
            }
            let key = InstanceKey::new(
                item.project_id,
                endpoint.host.clone(),
                endpoint.detail_division(),
            );
            if !seen_databases.insert((key.ip_address.clone(), key.detail_division.clone())) {
                continue;
            }
            database_drafts.push(InstanceDraft {
                key,
                domain: Domain::Database,
                detail_type: endpoint.kind.as_code().to_owned(),
                name: (!endpoint.database.is_empty()).then(|| endpoint.database.clone()),
                vendor: Some(endpoint.kind.vendor_name().to_owned()),
                version: None,
                origin: Some(RegistrationOrigin::Discovered),
                owner_inventory_id: None,
                finder_inventory_id: Some(item.inventory_id),
                touched_by: Some(item.process_id),
            });
        }

        interface_drafts.push(InterfaceDraft {
            kind: InterfaceKind::Datasource,
            name: endpoints[0].database.clone(),
            descriptors: vec![url.clone()],
            endpoints: endpoints
                .iter()
                .filter(|endpoint| !endpoint.host.is_empty())
                .map(|endpoint| Endpoint {
                    ip_address: endpoint.host.clone(),
                    port: endpoint.port,
                    service_name: (!endpoint.database.is_empty())
                        .then(|| endpoint.database.clone()),
                    username: None,
                })
                .collect(),
        });
    }

    (interface::finalize_interfaces(interface_drafts), database_drafts)
}

fn build_profile(finding: &ApplicationFinding) -> ApplicationProfile {
    ApplicationProfile {
        packaging: infer_packaging(finding),
        framework: detect_framework(&finding.libraries),
        https_used: finding
            .build_descriptors
            .iter()
            .any(|descriptor| descriptor.to_ascii_lowercase().contains("https://")),
    }
}

fn infer_packaging(finding: &ApplicationFinding) -> PackagingKind {
    let java = finding
        .language
        .as_deref()
        .is_some_and(|language| language.contains("java"));
    if !java {
        return PackagingKind::Etc;
    }
    let kind = |marker: &str| finding.kinds.iter().any(|k| k.contains(marker));
    if kind("enterprise") {
        PackagingKind::Ear
    } else if kind("web") {
        PackagingKind::War
    } else {
        PackagingKind::Jar
    }
}

/// Framework name and version, `"Spring Boot 2.7.5"` style. The candidate
/// jars sort so that eGovFrame beats Spring Boot beats Spring Core.
fn detect_framework(libraries: &[String]) -> Option<String> {
    let mut candidates: Vec<&String> = libraries
        .iter()
        .filter(|library| FRAMEWORK_JAR.is_match(library))
        .collect();
    candidates.sort();
    let jar = candidates.first()?;

    let name = if jar.contains("org.egovframe") {
        "eGovFrame"
    } else if jar.contains("spring-boot") {
        "Spring Boot"
    } else {
        "Spring"
    };
    match jar_version(jar) {
        Some(version) => Some(format!("{name} {version}")),
        None => Some(name.to_owned()),
    }
}

/// Version segment of a jar file name, the piece between the last dash and
/// the `.jar` suffix.
fn jar_version(jar: &str) -> Option<&str> {
    let stem = jar.strip_suffix(".jar")?;
    let (_, version) = stem.rsplit_once('-')?;
    (!version.is_empty()).then_some(version)
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// The unpacked analysis directory is scratch unless the analyzer worked in
/// place or on an uploaded source bundle.
async fn cleanup_analysis_dir(item: &WorkItem, finding: Option<&ApplicationFinding>) {
    let Some(dir) = finding.and_then(|f| f.analysis_dir.as_deref()) else {
        return;
    };
    let target = item.application.as_ref();
    if Some(dir) == target.map(|t| t.deploy_path.as_str())
        || Some(dir) == target.and_then(|t| t.upload_source_path.as_deref())
    {
        return;
    }
    if let Err(error) = tokio::fs::remove_dir_all(dir).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                process_id = %item.process_id,
                path = dir,
                %error,
                "analysis directory removal failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use migrex_model::{
        ConnectionDescriptor, InventoryId, ProcessId, ProjectId,
    };

    fn finding(language: Option<&str>, kinds: &[&str]) -> ApplicationFinding {
        ApplicationFinding {
            language: language.map(str::to_owned),
            kinds: kinds.iter().map(|k| (*k).to_owned()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn packaging_follows_language_and_kind() {
        assert_eq!(
            infer_packaging(&finding(Some("java"), &["enterprise"])),
            PackagingKind::Ear
        );
        assert_eq!(
            infer_packaging(&finding(Some("java"), &["web"])),
            PackagingKind::War
        );
        assert_eq!(infer_packaging(&finding(Some("java"), &[])), PackagingKind::Jar);
        assert_eq!(
            infer_packaging(&finding(Some("python"), &["web"])),
            PackagingKind::Etc
        );
        assert_eq!(infer_packaging(&finding(None, &[])), PackagingKind::Etc);
    }

    #[test]
    fn egovframe_outranks_the_spring_jars() {
        let libraries = vec![
            "spring-core-5.3.23.jar".to_owned(),
            "org.egovframe.rte.fdl.cmmn-4.1.0.jar".to_owned(),
            "spring-boot-2.7.5.jar".to_owned(),
        ];
        assert_eq!(
            detect_framework(&libraries).as_deref(),
            Some("eGovFrame 4.1.0")
        );
    }

    #[test]
    fn spring_boot_outranks_spring_core() {
        let libraries = vec![
            "spring-core-5.3.23.jar".to_owned(),
            "spring-boot-2.7.5.jar".to_owned(),
        ];
        assert_eq!(
            detect_framework(&libraries).as_deref(),
            Some("Spring Boot 2.7.5")
        );
        assert_eq!(detect_framework(&["commons-io-2.11.0.jar".to_owned()]), None);
    }

    #[test]
    fn runner_key_collapses_packaging_subtypes() {
        assert_eq!(runner_key("EAR"), "JAVA");
        assert_eq!(runner_key("WAR"), "JAVA");
        assert_eq!(runner_key("JAR"), "JAVA");
        assert_eq!(runner_key("ETC"), "JAVA");
    }

    #[test]
    fn datasources_produce_interfaces_and_database_drafts() {
        let item = WorkItem {
            process_id: ProcessId::new(31),
            project_id: ProjectId::new(1),
            inventory_id: InventoryId::new(88),
            domain: Domain::Application,
            detail_type: "WAR".into(),
            version_hint: None,
            connection: ConnectionDescriptor {
                ip_address: "10.0.0.12".into(),
                port: Some(22),
                username: Some("assess".into()),
                password: None,
                key_file: Some("/keys/assess.pem".into()),
                windows: false,
            },
            database: None,
            middleware: None,
            application: None,
            submitted_at: Utc::now(),
        };
        let urls = vec![
            "jdbc:mysql://db01:3306/orders".to_owned(),
            "jdbc:mysql://db01:3306/orders".to_owned(),
            "not a jdbc url".to_owned(),
        ];

        let (interfaces, databases) = datasource_plan(&item, &urls);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].name, "orders");
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].key.detail_division, "3306|orders");
        assert_eq!(databases[0].owner_inventory_id, None);
    }

    #[test]
    fn hard_coded_ip_paths_keep_only_the_file_name() {
        assert_eq!(base_name("/src/main/resources/db.properties"), "db.properties");
        assert_eq!(base_name(r"C:\app\conf\db.properties"), "db.properties");
        assert_eq!(base_name("db.properties"), "db.properties");
    }
}
