//! Postgres-backed store.
//!
//! Row mapping stays close to the schema: optional text columns are kept as
//! `NOT NULL DEFAULT ''` and translated to `Option` at the edge, endpoint and
//! binding lists ride in `jsonb` columns, and every replace-wholesale
//! operation runs delete-then-insert inside one transaction.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use migrex_model::{
    ApplicationProfile, CpuUsageWindow, DiscoveredInstance, DiscoveredInterface,
    DiskUsageWindow, Domain, HardCodedIp, InstanceDraft, InstanceId, InstanceKey,
    InterfaceId, InterfaceKind, InterfaceSpec, InventoryId, MemoryUsageWindow,
    MiddlewareRuntime, PortRelation, ProcessId, ProcessRecord, ProcessStatus,
    ProjectId, RegistrationOrigin, SchemaCensus, ServerFinding, WorkItem,
};

use crate::error::AssessError;
use crate::ports::store::{GraphStore, InventoryStore, MonitoringStore, ProcessStore};
use crate::Result;

/// One store over one pool, implementing every persistence port.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `''` in a defaulted text column means the value was never known.
fn text_or_none(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn decode_error(context: &str, err: impl std::fmt::Display) -> AssessError {
    AssessError::Internal(format!("{context}: {err}"))
}

fn instance_from_row(row: &PgRow) -> Result<DiscoveredInstance> {
    let domain: String = row.try_get("domain")?;
    let origin: Option<String> = row.try_get("origin")?;
    Ok(DiscoveredInstance {
        id: InstanceId::new(row.try_get("id")?),
        key: InstanceKey::new(
            ProjectId::new(row.try_get("project_id")?),
            row.try_get::<String, _>("ip_address")?,
            row.try_get::<String, _>("detail_division")?,
        ),
        domain: Domain::from_code(&domain)
            .map_err(|err| decode_error("bad instance domain", err))?,
        detail_type: row.try_get("detail_type")?,
        name: text_or_none(row.try_get("name")?),
        vendor: text_or_none(row.try_get("vendor")?),
        version: text_or_none(row.try_get("version")?),
        origin: origin
            .map(|code| RegistrationOrigin::from_code(&code))
            .transpose()
            .map_err(|err| decode_error("bad instance origin", err))?,
        owner_inventory_id: row
            .try_get::<Option<i64>, _>("owner_inventory_id")?
            .map(InventoryId::new),
        finder_inventory_id: row
            .try_get::<Option<i64>, _>("finder_inventory_id")?
            .map(InventoryId::new),
        deleted: row.try_get("deleted")?,
        last_process_id: row
            .try_get::<Option<i64>, _>("last_process_id")?
            .map(ProcessId::new),
        first_seen: row.try_get("first_seen")?,
        last_seen: row.try_get("last_seen")?,
    })
}

fn interface_from_row(row: &PgRow) -> Result<DiscoveredInterface> {
    let kind: String = row.try_get("kind")?;
    let endpoints: serde_json::Value = row.try_get("endpoints")?;
    Ok(DiscoveredInterface {
        id: InterfaceId::new(row.try_get("id")?),
        instance_id: InstanceId::new(row.try_get("instance_id")?),
        sequence: row.try_get("sequence")?,
        kind: InterfaceKind::from_code(&kind)
            .map_err(|err| decode_error("bad interface kind", err))?,
        name: row.try_get("name")?,
        full_descriptor: row.try_get("full_descriptor")?,
        endpoints: serde_json::from_value(endpoints)
            .map_err(|err| decode_error("bad interface endpoints", err))?,
    })
}

fn process_from_row(row: &PgRow) -> Result<ProcessRecord> {
    let domain: String = row.try_get("domain")?;
    let status: String = row.try_get("status")?;
    Ok(ProcessRecord {
        process_id: ProcessId::new(row.try_get("process_id")?),
        project_id: ProjectId::new(row.try_get("project_id")?),
        inventory_id: InventoryId::new(row.try_get("inventory_id")?),
        domain: Domain::from_code(&domain)
            .map_err(|err| decode_error("bad process domain", err))?,
        detail_type: row.try_get("detail_type")?,
        status: ProcessStatus::from_code(&status)
            .map_err(|err| decode_error("bad process status", err))?,
        message: row.try_get("message")?,
        report_path: row.try_get("report_path")?,
        report_eligible: row.try_get("report_eligible")?,
        submitted_at: row.try_get("submitted_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

const INSTANCE_COLUMNS: &str = "id, project_id, ip_address, detail_division, domain, \
     detail_type, name, vendor, version, origin, owner_inventory_id, \
     finder_inventory_id, deleted, last_process_id, first_seen, last_seen";

#[async_trait]
impl GraphStore for PostgresStore {
    async fn find_instance(&self, key: &InstanceKey) -> Result<Option<DiscoveredInstance>> {
        let row = sqlx::query(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM discovered_instance \
             WHERE project_id = $1 AND ip_address = $2 AND detail_division = $3"
        ))
        .bind(key.project_id.as_i64())
        .bind(&key.ip_address)
        .bind(&key.detail_division)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(instance_from_row).transpose()
    }

    async fn insert_instance(
        &self,
        draft: &InstanceDraft,
        now: DateTime<Utc>,
    ) -> Result<DiscoveredInstance> {
        let row = sqlx::query(
            r#"
            INSERT INTO discovered_instance (
                project_id, ip_address, detail_division, domain, detail_type,
                name, vendor, version, origin, owner_inventory_id,
                finder_inventory_id, deleted, last_process_id, first_seen, last_seen
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE, $12, $13, $13)
            RETURNING id
            "#,
        )
        .bind(draft.key.project_id.as_i64())
        .bind(&draft.key.ip_address)
        .bind(&draft.key.detail_division)
        .bind(draft.domain.as_code())
        .bind(&draft.detail_type)
        .bind(draft.name.as_deref().unwrap_or(""))
        .bind(draft.vendor.as_deref().unwrap_or(""))
        .bind(draft.version.as_deref().unwrap_or(""))
        .bind(draft.origin.map(|origin| origin.as_code()))
        .bind(draft.owner_inventory_id.map(|id| id.as_i64()))
        .bind(draft.finder_inventory_id.map(|id| id.as_i64()))
        .bind(draft.touched_by.map(|id| id.as_i64()))
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        Ok(DiscoveredInstance {
            id: InstanceId::new(row.try_get("id")?),
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
        })
    }

    async fn update_instance(&self, instance: &DiscoveredInstance) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE discovered_instance
            SET domain = $2, detail_type = $3, name = $4, vendor = $5,
                version = $6, origin = $7, owner_inventory_id = $8,
                finder_inventory_id = $9, deleted = $10, last_process_id = $11,
                last_seen = $12
            WHERE id = $1
            "#,
        )
        .bind(instance.id.as_i64())
        .bind(instance.domain.as_code())
        .bind(&instance.detail_type)
        .bind(instance.name.as_deref().unwrap_or(""))
        .bind(instance.vendor.as_deref().unwrap_or(""))
        .bind(instance.version.as_deref().unwrap_or(""))
        .bind(instance.origin.map(|origin| origin.as_code()))
        .bind(instance.owner_inventory_id.map(|id| id.as_i64()))
        .bind(instance.finder_inventory_id.map(|id| id.as_i64()))
        .bind(instance.deleted)
        .bind(instance.last_process_id.map(|id| id.as_i64()))
        .bind(instance.last_seen)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_instances(&self, project_id: ProjectId) -> Result<Vec<DiscoveredInstance>> {
        let rows = sqlx::query(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM discovered_instance \
             WHERE project_id = $1 ORDER BY id"
        ))
        .bind(project_id.as_i64())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(instance_from_row).collect()
    }

    async fn replace_interfaces(
        &self,
        instance_id: InstanceId,
        specs: &[InterfaceSpec],
    ) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM discovered_interface WHERE instance_id = $1")
            .bind(instance_id.as_i64())
            .execute(&mut *tx)
            .await?;
        for (index, spec) in specs.iter().enumerate() {
            let endpoints = serde_json::to_value(&spec.endpoints)?;
            sqlx::query(
                r#"
                INSERT INTO discovered_interface
                    (instance_id, sequence, kind, name, full_descriptor, endpoints)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(instance_id.as_i64())
            .bind(index as i32 + 1)
            .bind(spec.kind.as_code())
            .bind(&spec.name)
            .bind(&spec.full_descriptor)
            .bind(endpoints)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_interfaces(&self, instance_id: InstanceId) -> Result<Vec<DiscoveredInterface>> {
        let rows = sqlx::query(
            "SELECT id, instance_id, sequence, kind, name, full_descriptor, endpoints \
             FROM discovered_interface WHERE instance_id = $1 ORDER BY sequence",
        )
        .bind(instance_id.as_i64())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(interface_from_row).collect()
    }

    async fn upsert_middleware_runtime(
        &self,
        instance_id: InstanceId,
        runtime: &MiddlewareRuntime,
    ) -> Result<()> {
        let bindings = serde_json::to_value(&runtime.bindings)?;
        sqlx::query(
            r#"
            INSERT INTO middleware_runtime
                (instance_id, instance_path, config_path, run_user, java_version, bindings)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (instance_id) DO UPDATE SET
                instance_path = EXCLUDED.instance_path,
                config_path   = EXCLUDED.config_path,
                run_user      = EXCLUDED.run_user,
                java_version  = COALESCE(EXCLUDED.java_version, middleware_runtime.java_version),
                bindings      = EXCLUDED.bindings
            "#,
        )
        .bind(instance_id.as_i64())
        .bind(runtime.instance_path.as_deref())
        .bind(runtime.config_path.as_deref())
        .bind(runtime.run_user.as_deref())
        .bind(runtime.java_version.as_deref().filter(|v| !v.is_empty()))
        .bind(bindings)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn clear_running_users(&self, owner_inventory_id: InventoryId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE middleware_runtime
            SET run_user = NULL
            WHERE instance_id IN (
                SELECT id FROM discovered_instance WHERE owner_inventory_id = $1
            )
            "#,
        )
        .bind(owner_inventory_id.as_i64())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn upsert_schema_census(
        &self,
        instance_id: InstanceId,
        census: &SchemaCensus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schema_census (instance_id, table_count, view_count, procedure_count)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (instance_id) DO UPDATE SET
                table_count     = EXCLUDED.table_count,
                view_count      = EXCLUDED.view_count,
                procedure_count = EXCLUDED.procedure_count
            "#,
        )
        .bind(instance_id.as_i64())
        .bind(census.table_count)
        .bind(census.view_count)
        .bind(census.procedure_count)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn insert_port_relation(&self, relation: &PortRelation) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO port_relation (
                server_inventory_id, ip_address, protocol, direction, port,
                peer_ip, service_guess, local_port, foreign_port, observed_by,
                unique_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (unique_key) DO NOTHING
            "#,
        )
        .bind(relation.server_inventory_id.as_i64())
        .bind(&relation.ip_address)
        .bind(&relation.protocol)
        .bind(relation.direction.as_code())
        .bind(i32::from(relation.port))
        .bind(&relation.peer_ip)
        .bind(&relation.service_guess)
        .bind(i32::from(relation.local_port))
        .bind(i32::from(relation.foreign_port))
        .bind(relation.observed_by.map(|id| id.as_i64()))
        .bind(relation.unique_key())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_hard_coded_ips(
        &self,
        application_inventory_id: InventoryId,
        rows: &[HardCodedIp],
    ) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM hard_coded_ip WHERE application_inventory_id = $1")
            .bind(application_inventory_id.as_i64())
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO hard_coded_ip
                    (application_inventory_id, file_path, line_number, ip_address, port)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(application_inventory_id.as_i64())
            .bind(&row.file_path)
            .bind(row.line_number as i32)
            .bind(&row.ip_address)
            .bind(row.port.map(i32::from))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ProcessStore for PostgresStore {
    async fn register(&self, item: &WorkItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO assessment_process (
                process_id, project_id, inventory_id, domain, detail_type,
                status, submitted_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(item.process_id.as_i64())
        .bind(item.project_id.as_i64())
        .bind(item.inventory_id.as_i64())
        .bind(item.domain.as_code())
        .bind(&item.detail_type)
        .bind(ProcessStatus::Pending.as_code())
        .bind(item.submitted_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn mark_in_progress(&self, process_id: ProcessId, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE assessment_process
            SET status = $2, started_at = $3, updated_at = $3
            WHERE process_id = $1
            "#,
        )
        .bind(process_id.as_i64())
        .bind(ProcessStatus::InProgress.as_code())
        .bind(at)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AssessError::Internal(format!("unknown process {process_id}")));
        }
        Ok(())
    }

    async fn save_result(
        &self,
        process_id: ProcessId,
        message: Option<&str>,
        report_path: Option<&Path>,
        report_eligible: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE assessment_process
            SET message = $2, report_path = $3, report_eligible = $4, updated_at = $5
            WHERE process_id = $1
            "#,
        )
        .bind(process_id.as_i64())
        .bind(message)
        .bind(report_path.map(|path| path.to_string_lossy().into_owned()))
        .bind(report_eligible)
        .bind(at)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AssessError::Internal(format!("unknown process {process_id}")));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        process_id: ProcessId,
        status: ProcessStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE assessment_process
            SET status = $2,
                finished_at = CASE WHEN $3 THEN $4 ELSE finished_at END,
                updated_at = $4
            WHERE process_id = $1
            "#,
        )
        .bind(process_id.as_i64())
        .bind(status.as_code())
        .bind(status.is_terminal())
        .bind(at)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AssessError::Internal(format!("unknown process {process_id}")));
        }
        Ok(())
    }

    async fn fetch(&self, process_id: ProcessId) -> Result<Option<ProcessRecord>> {
        let row = sqlx::query(
            "SELECT process_id, project_id, inventory_id, domain, detail_type, \
             status, message, report_path, report_eligible, submitted_at, \
             started_at, finished_at \
             FROM assessment_process WHERE process_id = $1",
        )
        .bind(process_id.as_i64())
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(process_from_row).transpose()
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn update_middleware_engine(
        &self,
        inventory_id: InventoryId,
        engine_version: &str,
        java_vendor: &str,
        java_version: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO middleware_engine (inventory_id, engine_version, java_vendor, java_version)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (inventory_id) DO UPDATE SET
                engine_version = EXCLUDED.engine_version,
                java_vendor    = EXCLUDED.java_vendor,
                java_version   = EXCLUDED.java_version
            "#,
        )
        .bind(inventory_id.as_i64())
        .bind(engine_version)
        .bind(java_vendor)
        .bind(java_version)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_database_engine(
        &self,
        inventory_id: InventoryId,
        engine_version: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO database_engine (inventory_id, engine_version)
            VALUES ($1, $2)
            ON CONFLICT (inventory_id) DO UPDATE SET
                engine_version = EXCLUDED.engine_version
            "#,
        )
        .bind(inventory_id.as_i64())
        .bind(engine_version)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_application_profile(
        &self,
        inventory_id: InventoryId,
        profile: &ApplicationProfile,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO application_profile (inventory_id, packaging, framework, https_used)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (inventory_id) DO UPDATE SET
                packaging  = EXCLUDED.packaging,
                framework  = EXCLUDED.framework,
                https_used = EXCLUDED.https_used
            "#,
        )
        .bind(inventory_id.as_i64())
        .bind(profile.packaging.as_code())
        .bind(profile.framework.as_deref())
        .bind(profile.https_used)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn replace_server_profile(
        &self,
        inventory_id: InventoryId,
        finding: &ServerFinding,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            r#"
            INSERT INTO server_profile (
                inventory_id, hostname, os_name, os_version, os_family,
                kernel, architecture, cpu_model, cpu_cores, memory_mb, swap_mb
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (inventory_id) DO UPDATE SET
                hostname     = EXCLUDED.hostname,
                os_name      = EXCLUDED.os_name,
                os_version   = EXCLUDED.os_version,
                os_family    = EXCLUDED.os_family,
                kernel       = EXCLUDED.kernel,
                architecture = EXCLUDED.architecture,
                cpu_model    = EXCLUDED.cpu_model,
                cpu_cores    = EXCLUDED.cpu_cores,
                memory_mb    = EXCLUDED.memory_mb,
                swap_mb      = EXCLUDED.swap_mb
            "#,
        )
        .bind(inventory_id.as_i64())
        .bind(&finding.hostname)
        .bind(&finding.os_name)
        .bind(&finding.os_version)
        .bind(&finding.os_family)
        .bind(finding.kernel.as_deref().unwrap_or(""))
        .bind(finding.architecture.as_deref().unwrap_or(""))
        .bind(finding.cpu_model.as_deref().unwrap_or(""))
        .bind(finding.cpu_cores.unwrap_or(0))
        .bind(finding.memory_mb.unwrap_or(0))
        .bind(finding.swap_mb.unwrap_or(0))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM server_nic WHERE inventory_id = $1")
            .bind(inventory_id.as_i64())
            .execute(&mut *tx)
            .await?;
        for nic in &finding.interfaces {
            for ip in &nic.ip_addresses {
                sqlx::query(
                    r#"
                    INSERT INTO server_nic (inventory_id, name, ip_address, mac_address)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(inventory_id.as_i64())
                .bind(&nic.name)
                .bind(ip)
                .bind(nic.mac_address.as_deref())
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
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
        sqlx::query(
            r#"
            INSERT INTO server_status (inventory_id, cpu_usage, memory_usage, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (inventory_id) DO UPDATE SET
                cpu_usage    = EXCLUDED.cpu_usage,
                memory_usage = EXCLUDED.memory_usage,
                updated_at   = EXCLUDED.updated_at
            "#,
        )
        .bind(inventory_id.as_i64())
        .bind(cpu_usage)
        .bind(memory_usage)
        .bind(at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn registered_database_ports(
        &self,
        project_id: ProjectId,
        server_inventory_id: InventoryId,
    ) -> Result<HashSet<u16>> {
        let rows = sqlx::query(
            r#"
            SELECT dbms.port
            FROM inventory_master dbms
            JOIN inventory_master server ON server.inventory_id = $2
            WHERE dbms.project_id = $1
              AND dbms.domain = $3
              AND dbms.port IS NOT NULL
              AND dbms.ip_address = server.ip_address
            "#,
        )
        .bind(project_id.as_i64())
        .bind(server_inventory_id.as_i64())
        .bind(Domain::Database.as_code())
        .fetch_all(self.pool())
        .await?;

        let mut ports = HashSet::new();
        for row in &rows {
            let port: i32 = row.try_get("port")?;
            if let Ok(port) = u16::try_from(port) {
                ports.insert(port);
            }
        }
        Ok(ports)
    }

    async fn known_server_ips(&self, project_id: ProjectId) -> Result<HashSet<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT ip_address FROM inventory_master \
             WHERE project_id = $1 AND domain = $2 AND ip_address <> ''",
        )
        .bind(project_id.as_i64())
        .bind(Domain::Server.as_code())
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("ip_address").map_err(AssessError::from))
            .collect()
    }

    async fn server_primary_ip(
        &self,
        server_inventory_id: InventoryId,
    ) -> Result<Option<String>> {
        let row = sqlx::query("SELECT ip_address FROM inventory_master WHERE inventory_id = $1")
            .bind(server_inventory_id.as_i64())
            .fetch_optional(self.pool())
            .await?;
        Ok(row
            .map(|row| row.try_get::<String, _>("ip_address"))
            .transpose()?
            .filter(|ip| !ip.is_empty()))
    }

    async fn server_interface_ips(
        &self,
        server_inventory_id: InventoryId,
    ) -> Result<HashSet<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT ip_address FROM server_nic WHERE inventory_id = $1",
        )
        .bind(server_inventory_id.as_i64())
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("ip_address").map_err(AssessError::from))
            .collect()
    }
}

#[async_trait]
impl MonitoringStore for PostgresStore {
    async fn save_cpu_window(&self, window: &CpuUsageWindow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cpu_usage_window
                (server_inventory_id, window_time, sample_count, avg_value, max_value)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (server_inventory_id, window_time) DO UPDATE SET
                sample_count = EXCLUDED.sample_count,
                avg_value    = EXCLUDED.avg_value,
                max_value    = EXCLUDED.max_value
            "#,
        )
        .bind(window.server_inventory_id.as_i64())
        .bind(window.window_time)
        .bind(window.sample_count as i32)
        .bind(window.avg)
        .bind(window.max)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn save_memory_window(&self, window: &MemoryUsageWindow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memory_usage_window
                (server_inventory_id, window_time, sample_count, avg_value,
                 max_value, usage_avg, usage_max)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (server_inventory_id, window_time) DO UPDATE SET
                sample_count = EXCLUDED.sample_count,
                avg_value    = EXCLUDED.avg_value,
                max_value    = EXCLUDED.max_value,
                usage_avg    = EXCLUDED.usage_avg,
                usage_max    = EXCLUDED.usage_max
            "#,
        )
        .bind(window.server_inventory_id.as_i64())
        .bind(window.window_time)
        .bind(window.sample_count as i32)
        .bind(window.avg)
        .bind(window.max)
        .bind(window.usage_avg)
        .bind(window.usage_max)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn save_disk_window(&self, window: &DiskUsageWindow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO disk_usage_window
                (server_inventory_id, device, window_time, sample_count,
                 avg_value, max_value, usage_avg, usage_max)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (server_inventory_id, device, window_time) DO UPDATE SET
                sample_count = EXCLUDED.sample_count,
                avg_value    = EXCLUDED.avg_value,
                max_value    = EXCLUDED.max_value,
                usage_avg    = EXCLUDED.usage_avg,
                usage_max    = EXCLUDED.usage_max
            "#,
        )
        .bind(window.server_inventory_id.as_i64())
        .bind(&window.device)
        .bind(window.window_time)
        .bind(window.sample_count as i32)
        .bind(window.avg)
        .bind(window.max)
        .bind(window.usage_avg)
        .bind(window.usage_max)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
