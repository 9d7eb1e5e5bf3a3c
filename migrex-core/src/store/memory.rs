//! In-memory store, used by tests and as the ephemeral single-node backend.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use migrex_model::{
    ApplicationProfile, CpuUsageWindow, DiscoveredInstance, DiscoveredInterface,
    DiskUsageWindow, HardCodedIp, InstanceDraft, InstanceId, InstanceKey,
    InterfaceId, InterfaceSpec, InventoryId, MemoryUsageWindow,
    MiddlewareRuntime, PortRelation, ProcessId, ProcessRecord, ProcessStatus,
    ProjectId, SchemaCensus, ServerFinding, WorkItem,
};

use crate::error::AssessError;
use crate::ports::store::{GraphStore, InventoryStore, MonitoringStore, ProcessStore};
use crate::Result;

/// Whole persistence surface in concurrent maps.
///
/// Semantics mirror the Postgres store; tests additionally get seed methods
/// for the inventory lookups and accessors over what the engine wrote. The
/// graph mutation counter exists so cancellation tests can assert that a run
/// wrote nothing at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_instance_id: AtomicI64,
    next_interface_id: AtomicI64,
    graph_writes: AtomicUsize,

    instances: DashMap<i64, DiscoveredInstance>,
    instance_index: DashMap<InstanceKey, i64>,
    interfaces: DashMap<i64, Vec<DiscoveredInterface>>,
    runtimes: DashMap<i64, MiddlewareRuntime>,
    censuses: DashMap<i64, SchemaCensus>,
    relations: DashMap<String, PortRelation>,
    hard_coded: DashMap<i64, Vec<HardCodedIp>>,

    processes: DashMap<i64, ProcessRecord>,

    middleware_engines: DashMap<i64, (String, String, String)>,
    database_engines: DashMap<i64, String>,
    application_profiles: DashMap<i64, ApplicationProfile>,
    server_profiles: DashMap<i64, ServerFinding>,
    server_statuses: DashMap<i64, (Option<f64>, Option<f64>, DateTime<Utc>)>,

    database_ports: DashMap<(i64, i64), HashSet<u16>>,
    server_primary: DashMap<i64, String>,
    server_addresses: DashMap<i64, HashSet<String>>,
    project_server_ips: DashMap<i64, HashSet<String>>,

    cpu_windows: DashMap<(i64, DateTime<Utc>), CpuUsageWindow>,
    memory_windows: DashMap<(i64, DateTime<Utc>), MemoryUsageWindow>,
    disk_windows: DashMap<(i64, String, DateTime<Utc>), DiskUsageWindow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a database inventory row's port on a server, feeding the
    /// already-registered filter of unknown-database discovery.
    pub fn seed_database_port(
        &self,
        project_id: ProjectId,
        server_inventory_id: InventoryId,
        port: u16,
    ) {
        self.database_ports
            .entry((project_id.as_i64(), server_inventory_id.as_i64()))
            .or_default()
            .insert(port);
    }

    /// Registers a server inventory row: its primary address plus every
    /// interface address its last scan reported.
    pub fn seed_server(
        &self,
        project_id: ProjectId,
        inventory_id: InventoryId,
        primary_ip: &str,
        interface_ips: &[&str],
    ) {
        self.server_primary
            .insert(inventory_id.as_i64(), primary_ip.to_owned());
        let mut addresses: HashSet<String> =
            interface_ips.iter().map(|ip| (*ip).to_owned()).collect();
        addresses.insert(primary_ip.to_owned());
        self.server_addresses.insert(inventory_id.as_i64(), addresses);
        self.project_server_ips
            .entry(project_id.as_i64())
            .or_default()
            .insert(primary_ip.to_owned());
    }

    /// Count of graph mutations since construction.
    pub fn graph_write_count(&self) -> usize {
        self.graph_writes.load(Ordering::SeqCst)
    }

    pub fn schema_census(&self, instance_id: InstanceId) -> Option<SchemaCensus> {
        self.censuses.get(&instance_id.as_i64()).map(|entry| *entry)
    }

    pub fn middleware_runtime(&self, instance_id: InstanceId) -> Option<MiddlewareRuntime> {
        self.runtimes.get(&instance_id.as_i64()).map(|entry| entry.clone())
    }

    pub fn hard_coded_ips_for(&self, inventory_id: InventoryId) -> Vec<HardCodedIp> {
        self.hard_coded
            .get(&inventory_id.as_i64())
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub fn middleware_engine(
        &self,
        inventory_id: InventoryId,
    ) -> Option<(String, String, String)> {
        self.middleware_engines
            .get(&inventory_id.as_i64())
            .map(|entry| entry.clone())
    }

    pub fn database_engine(&self, inventory_id: InventoryId) -> Option<String> {
        self.database_engines
            .get(&inventory_id.as_i64())
            .map(|entry| entry.clone())
    }

    pub fn application_profile(&self, inventory_id: InventoryId) -> Option<ApplicationProfile> {
        self.application_profiles
            .get(&inventory_id.as_i64())
            .map(|entry| entry.clone())
    }

    pub fn server_profile(&self, inventory_id: InventoryId) -> Option<ServerFinding> {
        self.server_profiles
            .get(&inventory_id.as_i64())
            .map(|entry| entry.clone())
    }

    pub fn server_status(&self, inventory_id: InventoryId) -> Option<(Option<f64>, Option<f64>)> {
        self.server_statuses
            .get(&inventory_id.as_i64())
            .map(|entry| (entry.0, entry.1))
    }

    pub fn port_relations(&self) -> Vec<PortRelation> {
        self.relations.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn cpu_windows(&self, server: InventoryId) -> Vec<CpuUsageWindow> {
        let mut windows: Vec<CpuUsageWindow> = self
            .cpu_windows
            .iter()
            .filter(|entry| entry.key().0 == server.as_i64())
            .map(|entry| entry.value().clone())
            .collect();
        windows.sort_by_key(|window| window.window_time);
        windows
    }

    pub fn memory_windows(&self, server: InventoryId) -> Vec<MemoryUsageWindow> {
        let mut windows: Vec<MemoryUsageWindow> = self
            .memory_windows
            .iter()
            .filter(|entry| entry.key().0 == server.as_i64())
            .map(|entry| entry.value().clone())
            .collect();
        windows.sort_by_key(|window| window.window_time);
        windows
    }

    pub fn disk_windows(&self, server: InventoryId) -> Vec<DiskUsageWindow> {
        let mut windows: Vec<DiskUsageWindow> = self
            .disk_windows
            .iter()
            .filter(|entry| entry.key().0 == server.as_i64())
            .map(|entry| entry.value().clone())
            .collect();
        windows.sort_by(|a, b| {
            (a.device.as_str(), a.window_time).cmp(&(b.device.as_str(), b.window_time))
        });
        windows
    }

    fn touch_graph(&self) {
        self.graph_writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn find_instance(&self, key: &InstanceKey) -> Result<Option<DiscoveredInstance>> {
        let id = match self.instance_index.get(key) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        Ok(self.instances.get(&id).map(|entry| entry.clone()))
    }

    async fn insert_instance(
        &self,
        draft: &InstanceDraft,
        now: DateTime<Utc>,
    ) -> Result<DiscoveredInstance> {
        self.touch_graph();
        let id = self.next_instance_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = DiscoveredInstance {
            id: InstanceId::new(id),
            key: draft.key.clone(),
            domain: draft.domain,
            detail_type: draft.detail_type.clone(),
            name: draft.name.clone(),
            vendor: draft.vendor.clone(),
            version: draft.version.clone(),
            origin: draft.origin,
            owner_inventory_id: draft.owner_inventory_id,
            finder_inventory_id: draft.finder_inventory_id,
            deleted: false,
            last_process_id: draft.touched_by,
            first_seen: now,
            last_seen: now,
        };
        self.instances.insert(id, row.clone());
        self.instance_index.insert(draft.key.clone(), id);
        Ok(row)
    }

    async fn update_instance(&self, instance: &DiscoveredInstance) -> Result<()> {
        self.touch_graph();
        self.instances.insert(instance.id.as_i64(), instance.clone());
        Ok(())
    }

    async fn list_instances(&self, project_id: ProjectId) -> Result<Vec<DiscoveredInstance>> {
        let mut rows: Vec<DiscoveredInstance> = self
            .instances
            .iter()
            .filter(|entry| entry.key.project_id == project_id)
            .map(|entry| entry.clone())
            .collect();
        rows.sort_by_key(|row| row.id.as_i64());
        Ok(rows)
    }

    async fn replace_interfaces(
        &self,
        instance_id: InstanceId,
        specs: &[InterfaceSpec],
    ) -> Result<()> {
        self.touch_graph();
        let rows: Vec<DiscoveredInterface> = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| DiscoveredInterface {
                id: InterfaceId::new(
                    self.next_interface_id.fetch_add(1, Ordering::SeqCst) + 1,
                ),
                instance_id,
                sequence: index as i32 + 1,
                kind: spec.kind,
                name: spec.name.clone(),
                full_descriptor: spec.full_descriptor.clone(),
                endpoints: spec.endpoints.clone(),
            })
            .collect();
        self.interfaces.insert(instance_id.as_i64(), rows);
        Ok(())
    }

    async fn list_interfaces(&self, instance_id: InstanceId) -> Result<Vec<DiscoveredInterface>> {
        Ok(self
            .interfaces
            .get(&instance_id.as_i64())
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn upsert_middleware_runtime(
        &self,
        instance_id: InstanceId,
        runtime: &MiddlewareRuntime,
    ) -> Result<()> {
        self.touch_graph();
        let mut stored = runtime.clone();
        if stored.java_version.as_deref().map_or(true, str::is_empty) {
            if let Some(previous) = self.runtimes.get(&instance_id.as_i64()) {
                stored.java_version = previous.java_version.clone();
            }
        }
        self.runtimes.insert(instance_id.as_i64(), stored);
        Ok(())
    }

    async fn clear_running_users(&self, owner_inventory_id: InventoryId) -> Result<()> {
        self.touch_graph();
        let owned: Vec<i64> = self
            .instances
            .iter()
            .filter(|entry| entry.owner_inventory_id == Some(owner_inventory_id))
            .map(|entry| entry.id.as_i64())
            .collect();
        for id in owned {
            if let Some(mut runtime) = self.runtimes.get_mut(&id) {
                runtime.run_user = None;
            }
        }
        Ok(())
    }

    async fn upsert_schema_census(
        &self,
        instance_id: InstanceId,
        census: &SchemaCensus,
    ) -> Result<()> {
        self.touch_graph();
        self.censuses.insert(instance_id.as_i64(), *census);
        Ok(())
    }

    async fn insert_port_relation(&self, relation: &PortRelation) -> Result<bool> {
        self.touch_graph();
        let key = relation.unique_key();
        if self.relations.contains_key(&key) {
            return Ok(false);
        }
        self.relations.insert(key, relation.clone());
        Ok(true)
    }

    async fn replace_hard_coded_ips(
        &self,
        application_inventory_id: InventoryId,
        rows: &[HardCodedIp],
    ) -> Result<()> {
        self.touch_graph();
        self.hard_coded
            .insert(application_inventory_id.as_i64(), rows.to_vec());
        Ok(())
    }
}

#[async_trait]
impl ProcessStore for MemoryStore {
    async fn register(&self, item: &WorkItem) -> Result<()> {
        self.processes.insert(
            item.process_id.as_i64(),
            ProcessRecord {
                process_id: item.process_id,
                project_id: item.project_id,
                inventory_id: item.inventory_id,
                domain: item.domain,
                detail_type: item.detail_type.clone(),
                status: ProcessStatus::Pending,
                message: None,
                report_path: None,
                report_eligible: false,
                submitted_at: item.submitted_at,
                started_at: None,
                finished_at: None,
            },
        );
        Ok(())
    }

    async fn mark_in_progress(&self, process_id: ProcessId, at: DateTime<Utc>) -> Result<()> {
        let mut record = self
            .processes
            .get_mut(&process_id.as_i64())
            .ok_or_else(|| AssessError::Internal(format!("unknown process {process_id}")))?;
        record.status = ProcessStatus::InProgress;
        record.started_at = Some(at);
        Ok(())
    }

    async fn save_result(
        &self,
        process_id: ProcessId,
        message: Option<&str>,
        report_path: Option<&Path>,
        report_eligible: bool,
        _at: DateTime<Utc>,
    ) -> Result<()> {
        let mut record = self
            .processes
            .get_mut(&process_id.as_i64())
            .ok_or_else(|| AssessError::Internal(format!("unknown process {process_id}")))?;
        record.message = message.map(str::to_owned);
        record.report_path = report_path.map(|path| path.to_string_lossy().into_owned());
        record.report_eligible = report_eligible;
        Ok(())
    }

    async fn update_status(
        &self,
        process_id: ProcessId,
        status: ProcessStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut record = self
            .processes
            .get_mut(&process_id.as_i64())
            .ok_or_else(|| AssessError::Internal(format!("unknown process {process_id}")))?;
        record.status = status;
        if status.is_terminal() {
            record.finished_at = Some(at);
        }
        Ok(())
    }

    async fn fetch(&self, process_id: ProcessId) -> Result<Option<ProcessRecord>> {
        Ok(self.processes.get(&process_id.as_i64()).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn update_middleware_engine(
        &self,
        inventory_id: InventoryId,
        engine_version: &str,
        java_vendor: &str,
        java_version: &str,
    ) -> Result<()> {
        self.middleware_engines.insert(
            inventory_id.as_i64(),
            (
                engine_version.to_owned(),
                java_vendor.to_owned(),
                java_version.to_owned(),
            ),
        );
        Ok(())
    }

    async fn update_database_engine(
        &self,
        inventory_id: InventoryId,
        engine_version: &str,
    ) -> Result<()> {
        self.database_engines
            .insert(inventory_id.as_i64(), engine_version.to_owned());
        Ok(())
    }

    async fn update_application_profile(
        &self,
        inventory_id: InventoryId,
        profile: &ApplicationProfile,
    ) -> Result<()> {
        self.application_profiles
            .insert(inventory_id.as_i64(), profile.clone());
        Ok(())
    }

    async fn replace_server_profile(
        &self,
        inventory_id: InventoryId,
        finding: &ServerFinding,
    ) -> Result<()> {
        self.server_profiles.insert(inventory_id.as_i64(), finding.clone());
        let addresses: HashSet<String> = finding
            .interfaces
            .iter()
            .flat_map(|nic| nic.ip_addresses.iter().cloned())
            .collect();
        if !addresses.is_empty() {
            self.server_addresses
                .entry(inventory_id.as_i64())
                .or_default()
                .extend(addresses);
        }
        Ok(())
    }

    async fn upsert_server_status(
        &self,
        inventory_id: InventoryId,
        cpu_usage: Option<f64>,
        memory_usage: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if cpu_usage.is_none() && memory_usage.is_none() {
            return Ok(());
        }
        self.server_statuses
            .insert(inventory_id.as_i64(), (cpu_usage, memory_usage, at));
        Ok(())
    }

    async fn registered_database_ports(
        &self,
        project_id: ProjectId,
        server_inventory_id: InventoryId,
    ) -> Result<HashSet<u16>> {
        Ok(self
            .database_ports
            .get(&(project_id.as_i64(), server_inventory_id.as_i64()))
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn known_server_ips(&self, project_id: ProjectId) -> Result<HashSet<String>> {
        Ok(self
            .project_server_ips
            .get(&project_id.as_i64())
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn server_primary_ip(
        &self,
        server_inventory_id: InventoryId,
    ) -> Result<Option<String>> {
        Ok(self
            .server_primary
            .get(&server_inventory_id.as_i64())
            .map(|entry| entry.clone()))
    }

    async fn server_interface_ips(
        &self,
        server_inventory_id: InventoryId,
    ) -> Result<HashSet<String>> {
        Ok(self
            .server_addresses
            .get(&server_inventory_id.as_i64())
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl MonitoringStore for MemoryStore {
    async fn save_cpu_window(&self, window: &CpuUsageWindow) -> Result<()> {
        self.cpu_windows.insert(
            (window.server_inventory_id.as_i64(), window.window_time),
            window.clone(),
        );
        Ok(())
    }

    async fn save_memory_window(&self, window: &MemoryUsageWindow) -> Result<()> {
        self.memory_windows.insert(
            (window.server_inventory_id.as_i64(), window.window_time),
            window.clone(),
        );
        Ok(())
    }

    async fn save_disk_window(&self, window: &DiskUsageWindow) -> Result<()> {
        self.disk_windows.insert(
            (
                window.server_inventory_id.as_i64(),
                window.device.clone(),
                window.window_time,
            ),
            window.clone(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrex_model::{Domain, RegistrationOrigin};

    fn draft(division: &str) -> InstanceDraft {
        InstanceDraft {
            key: InstanceKey::new(ProjectId::new(1), "10.0.0.5", division),
            domain: Domain::Database,
            detail_type: "ORACLE".into(),
            name: Some("ORCL".into()),
            vendor: Some("Oracle".into()),
            version: None,
            origin: Some(RegistrationOrigin::Discovered),
            owner_inventory_id: None,
            finder_inventory_id: Some(InventoryId::new(4)),
            touched_by: Some(ProcessId::new(9)),
        }
    }

    #[tokio::test]
    async fn instances_are_found_under_their_key() {
        let store = MemoryStore::new();
        let inserted = store.insert_instance(&draft("1521|ORCL"), Utc::now()).await.unwrap();

        let found = store
            .find_instance(&InstanceKey::new(ProjectId::new(1), "10.0.0.5", "1521|ORCL"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, inserted.id);

        let missing = store
            .find_instance(&InstanceKey::new(ProjectId::new(2), "10.0.0.5", "1521|ORCL"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn interface_replacement_renumbers_sequences() {
        let store = MemoryStore::new();
        let instance = store.insert_instance(&draft("1521|ORCL"), Utc::now()).await.unwrap();

        let spec = |name: &str| InterfaceSpec {
            kind: migrex_model::InterfaceKind::Datasource,
            name: name.into(),
            full_descriptor: format!("jdbc:{name}"),
            endpoints: Vec::new(),
        };
        store
            .replace_interfaces(instance.id, &[spec("a"), spec("b")])
            .await
            .unwrap();
        store.replace_interfaces(instance.id, &[spec("c")]).await.unwrap();

        let rows = store.list_interfaces(instance.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sequence, 1);
        assert_eq!(rows[0].name, "c");
    }

    #[tokio::test]
    async fn empty_java_version_keeps_the_recorded_one() {
        let store = MemoryStore::new();
        let instance = store.insert_instance(&draft("/opt/tomcat"), Utc::now()).await.unwrap();

        let mut runtime = MiddlewareRuntime {
            java_version: Some("17.0.2".into()),
            ..Default::default()
        };
        store.upsert_middleware_runtime(instance.id, &runtime).await.unwrap();

        runtime.java_version = None;
        store.upsert_middleware_runtime(instance.id, &runtime).await.unwrap();

        let stored = store.middleware_runtime(instance.id).unwrap();
        assert_eq!(stored.java_version.as_deref(), Some("17.0.2"));
    }

    #[tokio::test]
    async fn terminal_status_stamps_the_finish_time() {
        let store = MemoryStore::new();
        let item = WorkItem {
            process_id: ProcessId::new(5),
            project_id: ProjectId::new(1),
            inventory_id: InventoryId::new(2),
            domain: Domain::Server,
            detail_type: "LINUX".into(),
            version_hint: None,
            connection: migrex_model::ConnectionDescriptor {
                ip_address: "10.0.0.5".into(),
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
        store.register(&item).await.unwrap();
        store.mark_in_progress(ProcessId::new(5), Utc::now()).await.unwrap();

        let record = store.fetch(ProcessId::new(5)).await.unwrap().unwrap();
        assert_eq!(record.status, ProcessStatus::InProgress);
        assert!(record.finished_at.is_none());

        store
            .update_status(ProcessId::new(5), ProcessStatus::Completed, Utc::now())
            .await
            .unwrap();
        let record = store.fetch(ProcessId::new(5)).await.unwrap().unwrap();
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_port_relations_are_rejected() {
        let store = MemoryStore::new();
        let relation = PortRelation {
            server_inventory_id: InventoryId::new(3),
            ip_address: "10.0.0.5".into(),
            protocol: "tcp".into(),
            direction: migrex_model::TrafficDirection::Outbound,
            port: 1521,
            peer_ip: "10.0.0.9".into(),
            service_guess: "Oracle".into(),
            local_port: 52100,
            foreign_port: 1521,
            observed_by: None,
        };
        assert!(store.insert_port_relation(&relation).await.unwrap());
        assert!(!store.insert_port_relation(&relation).await.unwrap());
        assert_eq!(store.port_relations().len(), 1);
    }
}
