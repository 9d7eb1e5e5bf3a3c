//! Core data model definitions shared across Migrex crates.
#![allow(missing_docs)]

pub mod codes;
pub mod error;
pub mod graph;
pub mod ids;
pub mod monitor;
pub mod outcome;
pub mod status;
pub mod work;

// Intentionally curated re-exports for downstream consumers.
pub use codes::{DatabaseKind, Domain, PackagingKind, RegistrationOrigin};
pub use error::{ModelError, Result as ModelResult};
pub use graph::{
    DiscoveredInstance, DiscoveredInterface, Endpoint, HardCodedIp,
    InstanceDraft, InstanceKey, InterfaceKind, InterfaceSpec,
    MiddlewareRuntime, PortBinding, PortRelation, SchemaCensus,
    TrafficDirection,
};
pub use ids::{
    InstanceId, InterfaceId, InventoryId, ProcessId, ProjectId, RunId,
};
pub use monitor::{
    CpuUsageWindow, DiskUsageWindow, MemoryUsageWindow, MetricKind,
    NetworkConnection,
};
pub use outcome::{
    AdminProbe, ApplicationFinding, ApplicationProfile, AssessmentOutcome,
    DaemonInfo, DatabaseFinding, DatasourceFinding, DbLinkFinding,
    DeployedApp, DiskInfo, HardCodedIpFinding, ListenPort, MiddlewareFinding,
    MiddlewareHint, MiddlewareInstanceFinding, NicInfo, ProcessInfo,
    SchemaFinding, ServerFinding,
};
pub use status::ProcessStatus;
pub use work::{
    ApplicationTarget, ConnectionDescriptor, DatabaseTarget,
    MiddlewareTarget, ProcessRecord, Secret, WorkItem,
};
