use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codes::PackagingKind;
use crate::graph::PortBinding;

/// Behavior shared by every scan result the committer consumes.
///
/// Runners record recoverable section failures in the error map instead of
/// aborting; a non-empty map downgrades the final status but never blocks
/// the merge.
pub trait AssessmentOutcome {
    /// Section name to operator-facing message, in insertion-stable order.
    fn error_map(&self) -> &BTreeMap<String, String>;

    /// Directory the runner left report artifacts in, if any.
    fn report_dir(&self) -> Option<&Path>;

    fn has_soft_errors(&self) -> bool {
        !self.error_map().is_empty()
    }
}

/// Administrator capability probed on the assessed host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdminProbe {
    pub root: bool,
    pub su_allowed: bool,
    pub sudoer: bool,
    /// Present only on Windows targets.
    pub windows_admin: Option<bool>,
}

impl AdminProbe {
    pub fn has_admin(&self) -> bool {
        self.root
            || self.su_allowed
            || self.sudoer
            || self.windows_admin.unwrap_or(false)
    }
}

/// Network interface reported by a server scan.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NicInfo {
    pub name: String,
    pub ip_addresses: Vec<String>,
    pub mac_address: Option<String>,
}

/// Mounted filesystem reported by a server scan.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskInfo {
    pub device: String,
    pub mount_point: String,
    pub filesystem: Option<String>,
    pub total_mb: Option<i64>,
    pub used_mb: Option<i64>,
}

/// Registered service or daemon on the assessed host.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DaemonInfo {
    pub name: String,
    pub status: Option<String>,
    pub start_mode: Option<String>,
}

/// Running process captured for third-party service discovery.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessInfo {
    pub pid: i32,
    pub user: Option<String>,
    pub command: String,
}

/// Listening socket captured by a server scan.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListenPort {
    pub protocol: String,
    pub ip_address: String,
    pub port: u16,
    pub pid: Option<i32>,
}

/// Middleware installation noticed during a server scan, used to queue
/// follow-on assessments.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MiddlewareHint {
    pub detail_type: String,
    pub install_path: String,
    pub version: Option<String>,
}

/// Everything a server scan brings home.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerFinding {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    /// Family key used for support lookups, e.g. `UBUNTU`, `AIX`.
    pub os_family: String,
    pub kernel: Option<String>,
    pub architecture: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_cores: Option<i32>,
    pub memory_mb: Option<i64>,
    pub swap_mb: Option<i64>,
    pub cpu_usage_percent: Option<f64>,
    pub memory_usage_percent: Option<f64>,
    pub interfaces: Vec<NicInfo>,
    pub disks: Vec<DiskInfo>,
    pub daemons: Vec<DaemonInfo>,
    pub processes: Vec<ProcessInfo>,
    pub listen_ports: Vec<ListenPort>,
    pub admin: AdminProbe,
    pub middleware_hints: Vec<MiddlewareHint>,
    pub error_map: BTreeMap<String, String>,
    pub report_dir: Option<PathBuf>,
}

impl AssessmentOutcome for ServerFinding {
    fn error_map(&self) -> &BTreeMap<String, String> {
        &self.error_map
    }

    fn report_dir(&self) -> Option<&Path> {
        self.report_dir.as_deref()
    }
}

/// Named datasource pulled out of instance configuration.
///
/// Passwords found next to the URL are dropped at the scan boundary; only
/// the account name travels further.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatasourceFinding {
    pub name: String,
    pub jdbc_url: String,
    pub username: Option<String>,
}

/// One configured middleware instance under an engine installation.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MiddlewareInstanceFinding {
    pub name: String,
    /// Instance home, used as the identity division inside the graph.
    pub instance_path: Option<String>,
    pub config_path: Option<String>,
    pub run_user: Option<String>,
    pub java_version: Option<String>,
    pub bindings: Vec<PortBinding>,
    pub datasources: Vec<DatasourceFinding>,
    pub deployed_apps: Vec<DeployedApp>,
    pub running: bool,
}

/// Application deployed under a middleware instance.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeployedApp {
    pub name: String,
    pub deploy_path: String,
}

/// Everything a middleware scan brings home.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MiddlewareFinding {
    pub engine_name: String,
    pub engine_version: Option<String>,
    pub install_path: Option<String>,
    pub vendor: Option<String>,
    pub java_vendor: Option<String>,
    pub java_version: Option<String>,
    pub running_in_container: bool,
    pub instances: Vec<MiddlewareInstanceFinding>,
    pub error_map: BTreeMap<String, String>,
    pub report_dir: Option<PathBuf>,
}

impl AssessmentOutcome for MiddlewareFinding {
    fn error_map(&self) -> &BTreeMap<String, String> {
        &self.error_map
    }

    fn report_dir(&self) -> Option<&Path> {
        self.report_dir.as_deref()
    }
}

/// Schema or database enumerated by a database scan.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaFinding {
    pub name: String,
    pub table_count: Option<i32>,
    pub view_count: Option<i32>,
    pub procedure_count: Option<i32>,
}

/// Database link enumerated by a database scan.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DbLinkFinding {
    pub name: String,
    pub host: String,
    pub port: Option<u16>,
    pub service_name: Option<String>,
}

/// Everything a database scan brings home.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatabaseFinding {
    pub engine_version: Option<String>,
    pub schemas: Vec<SchemaFinding>,
    pub db_links: Vec<DbLinkFinding>,
    pub error_map: BTreeMap<String, String>,
    pub report_dir: Option<PathBuf>,
}

impl AssessmentOutcome for DatabaseFinding {
    fn error_map(&self) -> &BTreeMap<String, String> {
        &self.error_map
    }

    fn report_dir(&self) -> Option<&Path> {
        self.report_dir.as_deref()
    }
}

/// Literal address found in application sources, before it is bound to an
/// inventory row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardCodedIpFinding {
    pub file_path: String,
    pub line_number: u32,
    pub ip_address: String,
    pub port: Option<u16>,
}

/// Facts about an application backfilled onto its inventory row after a
/// scan: packaging subtype, detected framework, https usage.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplicationProfile {
    pub packaging: PackagingKind,
    pub framework: Option<String>,
    pub https_used: bool,
}

/// Everything an application scan brings home.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplicationFinding {
    /// Dominant implementation language, lowercased, e.g. `java`.
    pub language: Option<String>,
    /// Artifact kind markers, e.g. `enterprise`, `web`.
    pub kinds: Vec<String>,
    /// Scratch directory the analyzer unpacked into, removed on cleanup
    /// when distinct from the deploy path.
    pub analysis_dir: Option<String>,
    pub libraries: Vec<String>,
    /// Raw build/deployment descriptor texts for framework detection.
    pub build_descriptors: Vec<String>,
    pub jdbc_urls: Vec<String>,
    pub hard_coded_ips: Vec<HardCodedIpFinding>,
    pub error_map: BTreeMap<String, String>,
    pub report_dir: Option<PathBuf>,
}

impl AssessmentOutcome for ApplicationFinding {
    fn error_map(&self) -> &BTreeMap<String, String> {
        &self.error_map
    }

    fn report_dir(&self) -> Option<&Path> {
        self.report_dir.as_deref()
    }
}
