use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codes::Domain;
use crate::ids::{InventoryId, ProcessId, ProjectId};

/// Credential material that is wiped from memory on drop and never logged.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// How to reach the assessed host.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionDescriptor {
    pub ip_address: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub password: Option<Secret>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub key_file: Option<String>,
    /// Windows targets are driven over WinRM instead of SSH.
    #[cfg_attr(feature = "serde", serde(default))]
    pub windows: bool,
}

impl ConnectionDescriptor {
    pub fn has_secret(&self) -> bool {
        self.password.as_ref().is_some_and(|p| !p.is_empty())
            || self.key_file.as_ref().is_some_and(|k| !k.is_empty())
    }

    pub fn username_or_empty(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }
}

/// Extra addressing for a database assessment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatabaseTarget {
    /// SID or service/database name the engine is reached under.
    pub service_name: String,
}

/// Extra addressing for a middleware assessment.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MiddlewareTarget {
    #[cfg_attr(feature = "serde", serde(default))]
    pub engine_install_path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub domain_home_path: Option<String>,
}

/// Extra addressing for an application assessment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplicationTarget {
    /// Where the deployed artifact lives on the target host.
    pub deploy_path: String,
    /// Operator-uploaded source bundle, kept across cleanups.
    #[cfg_attr(feature = "serde", serde(default))]
    pub upload_source_path: Option<String>,
}

/// One unit of assessment work pulled off the intake queue.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkItem {
    pub process_id: ProcessId,
    pub project_id: ProjectId,
    pub inventory_id: InventoryId,
    pub domain: Domain,
    /// Inventory detail type code, e.g. `TOMCAT`, `ORACLE`, `LINUX`.
    pub detail_type: String,
    /// Operator-declared version, if any; resolution may refine it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version_hint: Option<String>,
    pub connection: ConnectionDescriptor,
    #[cfg_attr(feature = "serde", serde(default))]
    pub database: Option<DatabaseTarget>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub middleware: Option<MiddlewareTarget>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub application: Option<ApplicationTarget>,
    pub submitted_at: DateTime<Utc>,
}

impl WorkItem {
    /// Detail type normalized the way registry keys are built.
    pub fn detail_type_key(&self) -> String {
        self.detail_type.trim().to_ascii_uppercase()
    }
}

/// Lifecycle row of an assessment process as the store keeps it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessRecord {
    pub process_id: ProcessId,
    pub project_id: ProjectId,
    pub inventory_id: InventoryId,
    pub domain: Domain,
    pub detail_type: String,
    pub status: crate::status::ProcessStatus,
    pub message: Option<String>,
    pub report_path: Option<String>,
    pub report_eligible: bool,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("swordfish");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.expose(), "swordfish");
    }

    #[test]
    fn connection_secret_presence() {
        let mut conn = ConnectionDescriptor {
            ip_address: "192.168.0.10".into(),
            port: Some(22),
            username: Some("assess".into()),
            password: None,
            key_file: None,
            windows: false,
        };
        assert!(!conn.has_secret());
        conn.key_file = Some("/keys/assess.pem".into());
        assert!(conn.has_secret());
        conn.key_file = Some(String::new());
        conn.password = Some(Secret::new("pw"));
        assert!(conn.has_secret());
    }
}
