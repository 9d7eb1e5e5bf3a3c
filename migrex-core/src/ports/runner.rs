use std::path::Path;

use async_trait::async_trait;

use migrex_model::{
    ApplicationFinding, ConnectionDescriptor, DatabaseFinding, DeployedApp,
    InstanceDraft, InterfaceSpec, MiddlewareFinding, MiddlewareRuntime,
    ServerFinding, WorkItem,
};

use crate::Result;

/// Server scan component, resolved per OS family via the registry.
#[async_trait]
pub trait ServerScanRunner: Send + Sync {
    async fn scan(
        &self,
        connection: &ConnectionDescriptor,
        item: &WorkItem,
    ) -> Result<ServerFinding>;
}

/// Middleware scan component, resolved per engine type and major version.
#[async_trait]
pub trait MiddlewareScanRunner: Send + Sync {
    async fn scan(
        &self,
        connection: &ConnectionDescriptor,
        item: &WorkItem,
    ) -> Result<MiddlewareFinding>;
}

/// Database scan component; talks to the engine directly over its own
/// protocol, so no host connection is handed in.
#[async_trait]
pub trait DatabaseScanRunner: Send + Sync {
    async fn scan(&self, item: &WorkItem) -> Result<DatabaseFinding>;
}

/// Application scan component; unpacks and analyzes under `work_dir`.
#[async_trait]
pub trait ApplicationScanRunner: Send + Sync {
    async fn scan(
        &self,
        connection: &ConnectionDescriptor,
        item: &WorkItem,
        work_dir: &Path,
    ) -> Result<ApplicationFinding>;
}

/// Merge work for one configured middleware instance.
#[derive(Debug, Clone)]
pub struct MiddlewareInstancePlan {
    pub draft: InstanceDraft,
    pub runtime: MiddlewareRuntime,
    /// Datasource interfaces attached to the middleware instance.
    pub datasources: Vec<InterfaceSpec>,
    /// Database instances the datasources point at.
    pub discovered_databases: Vec<InstanceDraft>,
    /// Hosted applications, candidates for follow-on assessment.
    pub deployed_apps: Vec<DeployedApp>,
}

/// Everything the merge persists for one middleware scan.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareMergePlan {
    pub instances: Vec<MiddlewareInstancePlan>,
}

/// Turns a middleware finding into a merge plan.
///
/// Resolved through the registry with the same versioned-then-bare fallback
/// as runners; a missing post-processor means the engine version cannot be
/// post-processed and the run ends `NotSupported`.
pub trait MiddlewarePostProcessor: Send + Sync {
    fn plan(
        &self,
        item: &WorkItem,
        finding: &MiddlewareFinding,
    ) -> Result<MiddlewareMergePlan>;
}
