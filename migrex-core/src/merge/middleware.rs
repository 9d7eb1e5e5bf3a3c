//! Turns middleware findings into merge plans.

use std::collections::HashSet;

use migrex_model::{
    DeployedApp, Domain, Endpoint, InstanceDraft, InstanceKey, InterfaceKind,
    MiddlewareFinding, MiddlewareInstanceFinding, MiddlewareRuntime,
    RegistrationOrigin, WorkItem,
};

use crate::merge::interface::{self, InterfaceDraft};
use crate::merge::{jdbc, text};
use crate::ports::runner::{
    MiddlewareInstancePlan, MiddlewareMergePlan, MiddlewarePostProcessor,
};
use crate::Result;

/// Planner shared by every engine family whose findings follow the common
/// instance/datasource shape. Engine families needing more than this
/// register their own post-processor under a versioned key.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMiddlewarePlanner;

impl MiddlewarePostProcessor for StandardMiddlewarePlanner {
    fn plan(&self, item: &WorkItem, finding: &MiddlewareFinding) -> Result<MiddlewareMergePlan> {
        let instances = finding
            .instances
            .iter()
            .map(|instance| plan_instance(item, finding, instance))
            .collect();
        Ok(MiddlewareMergePlan { instances })
    }
}

fn plan_instance(
    item: &WorkItem,
    finding: &MiddlewareFinding,
    instance: &MiddlewareInstanceFinding,
) -> MiddlewareInstancePlan {
    let draft = InstanceDraft {
        key: InstanceKey::new(
            item.project_id,
            item.connection.ip_address.clone(),
            instance_division(instance),
        ),
        domain: Domain::Middleware,
        detail_type: item.detail_type_key(),
        name: Some(instance.name.clone()),
        vendor: finding.vendor.clone(),
        version: finding.engine_version.clone(),
        origin: Some(RegistrationOrigin::Inventory),
        owner_inventory_id: Some(item.inventory_id),
        finder_inventory_id: Some(item.inventory_id),
        touched_by: Some(item.process_id),
    };

    let runtime = MiddlewareRuntime {
        instance_path: instance.instance_path.clone(),
        config_path: instance.config_path.clone(),
        // A stopped instance has no run user worth recording.
        run_user: if instance.running {
            instance.run_user.clone()
        } else {
            None
        },
        java_version: instance.java_version.clone(),
        bindings: instance.bindings.clone(),
    };

    let mut datasource_drafts = Vec::new();
    let mut discovered_databases = Vec::new();
    let mut seen_databases = HashSet::new();
    for datasource in &instance.datasources {
        let endpoints = jdbc::parse(&datasource.jdbc_url);

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
            discovered_databases.push(InstanceDraft {
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

        datasource_drafts.push(InterfaceDraft {
            kind: InterfaceKind::Datasource,
            name: datasource.name.clone(),
            descriptors: vec![datasource.jdbc_url.clone()],
            endpoints: endpoints
                .iter()
                .filter(|endpoint| !endpoint.host.is_empty())
                .map(|endpoint| Endpoint {
                    ip_address: endpoint.host.clone(),
                    port: endpoint.port,
                    service_name: (!endpoint.database.is_empty())
                        .then(|| endpoint.database.clone()),
                    username: datasource.username.clone(),
                })
                .collect(),
        });
    }

    MiddlewareInstancePlan {
        draft,
        runtime,
        datasources: interface::finalize_interfaces(datasource_drafts),
        discovered_databases,
        deployed_apps: instance
            .deployed_apps
            .iter()
            .filter(|app| has_real_deploy_path(app))
            .cloned()
            .collect(),
    }
}

/// Instances are identified by their home directory; nameless homes fall
/// back to the instance name.
fn instance_division(instance: &MiddlewareInstanceFinding) -> String {
    instance
        .instance_path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| instance.name.clone())
}

/// Config templating gone wrong produces paths ending in `null`; those
/// deployments do not exist.
fn has_real_deploy_path(app: &DeployedApp) -> bool {
    !app.deploy_path.is_empty()
        && !app.deploy_path.ends_with("/null")
        && !app.deploy_path.ends_with("\\null")
}
