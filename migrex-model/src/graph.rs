use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

use crate::codes::{Domain, RegistrationOrigin};
use crate::error::ModelError;
use crate::ids::{InstanceId, InterfaceId, InventoryId, ProcessId, ProjectId};

/// Identity of a discovered instance inside a project.
///
/// Two scans that produce the same key are talking about the same thing and
/// must merge, never duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceKey {
    pub project_id: ProjectId,
    pub ip_address: String,
    /// Disambiguates instances sharing an address, e.g. `"1521|ORCL"`.
    pub detail_division: String,
}

impl InstanceKey {
    pub fn new(
        project_id: ProjectId,
        ip_address: impl Into<String>,
        detail_division: impl Into<String>,
    ) -> Self {
        InstanceKey {
            project_id,
            ip_address: ip_address.into(),
            detail_division: detail_division.into(),
        }
    }
}

impl Display for InstanceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.project_id, self.ip_address, self.detail_division
        )
    }
}

/// Candidate instance produced by a scan, before the merge decides what
/// survives into the graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceDraft {
    pub key: InstanceKey,
    pub domain: Domain,
    pub detail_type: String,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub origin: Option<RegistrationOrigin>,
    pub owner_inventory_id: Option<InventoryId>,
    /// Inventory row whose scan produced this draft.
    pub finder_inventory_id: Option<InventoryId>,
    /// Assessment process behind the draft; monitoring observations have none.
    pub touched_by: Option<ProcessId>,
}

/// Persisted discovered-instance row.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveredInstance {
    pub id: InstanceId,
    pub key: InstanceKey,
    pub domain: Domain,
    pub detail_type: String,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub origin: Option<RegistrationOrigin>,
    /// Inventory row this instance is bound to, once known.
    pub owner_inventory_id: Option<InventoryId>,
    /// Inventory row whose scan most recently found this instance.
    pub finder_inventory_id: Option<InventoryId>,
    /// Soft-delete marker; any touch resurrects the row.
    pub deleted: bool,
    /// Most recent assessment process that touched this row, if any did.
    pub last_process_id: Option<ProcessId>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// What an interface row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterfaceKind {
    /// Outbound datasource (JDBC or similar).
    Datasource,
    /// Database link to a remote engine.
    DbLink,
}

impl InterfaceKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            InterfaceKind::Datasource => "DS",
            InterfaceKind::DbLink => "DBLINK",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ModelError> {
        match code {
            "DS" => Ok(InterfaceKind::Datasource),
            "DBLINK" => Ok(InterfaceKind::DbLink),
            other => Err(ModelError::InvalidCode(format!(
                "unknown interface kind: {other}"
            ))),
        }
    }
}

/// Network endpoint an interface points at.
///
/// Credential material is never persisted here; only the account name
/// survives the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub ip_address: String,
    /// 0 when the port could not be determined.
    pub port: u16,
    pub service_name: Option<String>,
    pub username: Option<String>,
}

/// Interface candidate handed to the merge; name and descriptor are
/// truncated to column width before persisting.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceSpec {
    pub kind: InterfaceKind,
    pub name: String,
    pub full_descriptor: String,
    pub endpoints: Vec<Endpoint>,
}

/// Persisted interface row; `sequence` starts at 1 within an instance.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveredInterface {
    pub id: InterfaceId,
    pub instance_id: InstanceId,
    pub sequence: i32,
    pub kind: InterfaceKind,
    pub name: String,
    pub full_descriptor: String,
    pub endpoints: Vec<Endpoint>,
}

/// Direction of an observed traffic relation, seen from the assessed host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrafficDirection {
    Inbound,
    Outbound,
}

impl TrafficDirection {
    pub fn as_code(&self) -> &'static str {
        match self {
            TrafficDirection::Inbound => "INB",
            TrafficDirection::Outbound => "OUTB",
        }
    }
}

impl Display for TrafficDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Observed port-level relation between the assessed server and a peer.
///
/// `port` is the service port: the local port for inbound relations, the
/// foreign port for outbound ones. The raw observation that produced the
/// relation rides along on the row.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortRelation {
    pub server_inventory_id: InventoryId,
    pub ip_address: String,
    pub protocol: String,
    pub direction: TrafficDirection,
    pub port: u16,
    pub peer_ip: String,
    /// Well-known service name for the port, or `Custom`.
    pub service_guess: String,
    pub local_port: u16,
    pub foreign_port: u16,
    /// Process that made the observation, absent for monitoring samples.
    pub observed_by: Option<ProcessId>,
}

impl PortRelation {
    /// Dedup key; one row per distinct relation.
    pub fn unique_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.server_inventory_id.as_i64(),
            self.ip_address,
            self.protocol,
            self.direction.as_code(),
            self.port,
            self.peer_ip
        )
    }
}

/// Literal network address found inside application sources.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardCodedIp {
    pub application_inventory_id: InventoryId,
    pub file_path: String,
    pub line_number: u32,
    pub ip_address: String,
    pub port: Option<u16>,
}

/// Listening socket a middleware instance is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortBinding {
    pub port: u16,
    pub protocol: String,
}

/// Runtime attributes recorded per discovered middleware instance.
///
/// Replaced on every rescan, except that an empty incoming Java version
/// keeps the previously recorded one (a stopped instance reports none).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MiddlewareRuntime {
    pub instance_path: Option<String>,
    pub config_path: Option<String>,
    pub run_user: Option<String>,
    pub java_version: Option<String>,
    pub bindings: Vec<PortBinding>,
}

/// Object census of a discovered database schema, replaced on every rescan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaCensus {
    pub table_count: Option<i32>,
    pub view_count: Option<i32>,
    pub procedure_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_relation_key_shape() {
        let relation = PortRelation {
            server_inventory_id: InventoryId::new(42),
            ip_address: "10.0.0.5".into(),
            protocol: "tcp".into(),
            direction: TrafficDirection::Inbound,
            port: 8080,
            peer_ip: "10.0.0.9".into(),
            service_guess: "HTTP".into(),
            local_port: 8080,
            foreign_port: 52144,
            observed_by: None,
        };
        assert_eq!(relation.unique_key(), "42|10.0.0.5|tcp|INB|8080|10.0.0.9");
    }
}
