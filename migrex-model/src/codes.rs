use std::fmt::{Display, Formatter};

use crate::error::ModelError;

/// Assessment domain an inventory row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Domain {
    Server,
    Middleware,
    Database,
    Application,
}

impl Domain {
    /// Wire code carried on inventory and process rows.
    pub fn as_code(&self) -> &'static str {
        match self {
            Domain::Server => "SVR",
            Domain::Middleware => "MW",
            Domain::Database => "DBMS",
            Domain::Application => "APP",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ModelError> {
        match code {
            "SVR" => Ok(Domain::Server),
            "MW" => Ok(Domain::Middleware),
            "DBMS" => Ok(Domain::Database),
            "APP" => Ok(Domain::Application),
            other => {
                Err(ModelError::InvalidCode(format!("unknown domain: {other}")))
            }
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// How a discovered instance entered the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistrationOrigin {
    /// Backed by a registered inventory row.
    Inventory,
    /// Found by a scan, not yet registered.
    Discovered,
}

impl RegistrationOrigin {
    pub fn as_code(&self) -> &'static str {
        match self {
            RegistrationOrigin::Inventory => "INV",
            RegistrationOrigin::Discovered => "DISC",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ModelError> {
        match code {
            "INV" => Ok(RegistrationOrigin::Inventory),
            "DISC" => Ok(RegistrationOrigin::Discovered),
            other => {
                Err(ModelError::InvalidCode(format!("unknown origin: {other}")))
            }
        }
    }
}

impl Display for RegistrationOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Database engines the merger knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DatabaseKind {
    Oracle,
    MySql,
    MariaDb,
    Tibero,
    MsSql,
    Sybase,
    PostgreSql,
}

impl DatabaseKind {
    pub fn from_detail_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "ORACLE" => Some(DatabaseKind::Oracle),
            "MYSQL" => Some(DatabaseKind::MySql),
            "MARIADB" => Some(DatabaseKind::MariaDb),
            "TIBERO" => Some(DatabaseKind::Tibero),
            "MSSQL" | "SQLSERVER" => Some(DatabaseKind::MsSql),
            "SYBASE" => Some(DatabaseKind::Sybase),
            "POSTGRE" | "POSTGRESQL" => Some(DatabaseKind::PostgreSql),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            DatabaseKind::Oracle => "ORACLE",
            DatabaseKind::MySql => "MYSQL",
            DatabaseKind::MariaDb => "MARIADB",
            DatabaseKind::Tibero => "TIBERO",
            DatabaseKind::MsSql => "MSSQL",
            DatabaseKind::Sybase => "SYBASE",
            DatabaseKind::PostgreSql => "POSTGRESQL",
        }
    }

    /// Vendor string recorded on discovered database instances.
    pub fn vendor_name(&self) -> &'static str {
        match self {
            DatabaseKind::Oracle | DatabaseKind::MySql => "Oracle",
            DatabaseKind::MariaDb => "MariaDB Foundation",
            DatabaseKind::Tibero => "TmaxSoft",
            DatabaseKind::MsSql => "Microsoft",
            DatabaseKind::Sybase => "SAP",
            DatabaseKind::PostgreSql => {
                "PostgreSQL Global Development Group"
            }
        }
    }
}

impl Display for DatabaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Packaging classification for assessed applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PackagingKind {
    Ear,
    War,
    Jar,
    Etc,
}

impl PackagingKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            PackagingKind::Ear => "EAR",
            PackagingKind::War => "WAR",
            PackagingKind::Jar => "JAR",
            PackagingKind::Etc => "ETC",
        }
    }
}

impl Display for PackagingKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}
