use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use migrex_model::{
    ApplicationProfile, CpuUsageWindow, DiscoveredInstance, DiscoveredInterface,
    DiskUsageWindow, HardCodedIp, InstanceDraft, InstanceId, InstanceKey,
    InterfaceSpec, InventoryId, MemoryUsageWindow, MiddlewareRuntime, PortRelation,
    ProcessId, ProcessRecord, ProcessStatus, ProjectId, SchemaCensus,
    ServerFinding, WorkItem,
};

use crate::Result;

/// Discovery-graph persistence.
///
/// Instances are keyed by `(project, ip, detail division)`; the merge layer
/// decides field-by-field what an upsert may overwrite, the store only reads
/// and writes rows.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn find_instance(&self, key: &InstanceKey) -> Result<Option<DiscoveredInstance>>;

    async fn insert_instance(
        &self,
        draft: &InstanceDraft,
        now: DateTime<Utc>,
    ) -> Result<DiscoveredInstance>;

    async fn update_instance(&self, instance: &DiscoveredInstance) -> Result<()>;

    async fn list_instances(&self, project_id: ProjectId) -> Result<Vec<DiscoveredInstance>>;

    /// Drops every interface of the instance and reinserts the given set,
    /// numbering sequences from 1 in order.
    async fn replace_interfaces(
        &self,
        instance_id: InstanceId,
        specs: &[InterfaceSpec],
    ) -> Result<()>;

    async fn list_interfaces(&self, instance_id: InstanceId) -> Result<Vec<DiscoveredInterface>>;

    /// Writes the runtime row for a middleware instance. An empty incoming
    /// java version keeps whatever the previous scan recorded.
    async fn upsert_middleware_runtime(
        &self,
        instance_id: InstanceId,
        runtime: &MiddlewareRuntime,
    ) -> Result<()>;

    /// Clears the recorded run user on every runtime owned by the inventory
    /// row, ahead of a rescan marking the ones actually seen running.
    async fn clear_running_users(&self, owner_inventory_id: InventoryId) -> Result<()>;

    /// Writes the object census for a database schema instance.
    async fn upsert_schema_census(
        &self,
        instance_id: InstanceId,
        census: &SchemaCensus,
    ) -> Result<()>;

    /// Inserts a relation unless its unique key is already present.
    /// Returns whether a row was written.
    async fn insert_port_relation(&self, relation: &PortRelation) -> Result<bool>;

    /// Replaces the hard-coded IP findings of an application wholesale.
    async fn replace_hard_coded_ips(
        &self,
        application_inventory_id: InventoryId,
        rows: &[HardCodedIp],
    ) -> Result<()>;
}

/// Assessment process lifecycle rows.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Records a submitted item as pending.
    async fn register(&self, item: &WorkItem) -> Result<()>;

    /// Flips a pending process to in-progress and stamps its start time.
    async fn mark_in_progress(&self, process_id: ProcessId, at: DateTime<Utc>) -> Result<()>;

    /// Persists the commit outcome: accumulated message, report location and
    /// whether a report can be produced at all.
    async fn save_result(
        &self,
        process_id: ProcessId,
        message: Option<&str>,
        report_path: Option<&Path>,
        report_eligible: bool,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Writes the final status; terminal statuses also stamp the finish time.
    async fn update_status(
        &self,
        process_id: ProcessId,
        status: ProcessStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn fetch(&self, process_id: ProcessId) -> Result<Option<ProcessRecord>>;
}

/// Inventory-master side tables refreshed from scan findings.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Engine version and JVM details for a middleware inventory row.
    /// Missing values are stored as empty strings, never skipped.
    async fn update_middleware_engine(
        &self,
        inventory_id: InventoryId,
        engine_version: &str,
        java_vendor: &str,
        java_version: &str,
    ) -> Result<()>;

    async fn update_database_engine(
        &self,
        inventory_id: InventoryId,
        engine_version: &str,
    ) -> Result<()>;

    async fn update_application_profile(
        &self,
        inventory_id: InventoryId,
        profile: &ApplicationProfile,
    ) -> Result<()>;

    async fn replace_server_profile(
        &self,
        inventory_id: InventoryId,
        finding: &ServerFinding,
    ) -> Result<()>;

    /// Latest resource snapshot for a server. When both incoming values are
    /// absent an existing row is left untouched rather than blanked.
    async fn upsert_server_status(
        &self,
        inventory_id: InventoryId,
        cpu_usage: Option<f64>,
        memory_usage: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Ports of database inventory rows already registered on the given
    /// server, used to avoid re-discovering what the inventory knows.
    async fn registered_database_ports(
        &self,
        project_id: ProjectId,
        server_inventory_id: InventoryId,
    ) -> Result<HashSet<u16>>;

    /// Addresses of servers already registered in the project.
    async fn known_server_ips(&self, project_id: ProjectId) -> Result<HashSet<String>>;

    /// Primary address of a registered server inventory row.
    async fn server_primary_ip(
        &self,
        server_inventory_id: InventoryId,
    ) -> Result<Option<String>>;

    /// Every address bound on the server's interfaces, primary included.
    async fn server_interface_ips(
        &self,
        server_inventory_id: InventoryId,
    ) -> Result<HashSet<String>>;
}

/// Aggregated monitoring windows. Saving the same window twice replaces it.
#[async_trait]
pub trait MonitoringStore: Send + Sync {
    async fn save_cpu_window(&self, window: &CpuUsageWindow) -> Result<()>;

    async fn save_memory_window(&self, window: &MemoryUsageWindow) -> Result<()>;

    async fn save_disk_window(&self, window: &DiskUsageWindow) -> Result<()>;
}
