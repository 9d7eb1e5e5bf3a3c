//! Support matrix for assessed targets.
//!
//! A target below its floor still gets scanned; the caller only attaches an
//! advisory message warning that information may be missing. Unknown
//! families and empty versions sit below every floor.

use crate::version::VersionNumber;

fn meets(version: &str, floor: &str) -> bool {
    let version = VersionNumber::parse(version);
    if version.is_empty() {
        return false;
    }
    version.at_least(&VersionNumber::parse(floor))
}

/// Whether the operating system version has been tested.
///
/// `os_family` is the normalized family key a server scan reports, e.g.
/// `UBUNTU` or `AIX`. Windows passes without a version check; the agent
/// prerequisite gate already filtered unsupported editions.
pub fn os_supported(os_family: &str, os_version: &str) -> bool {
    let family = os_family.trim().to_ascii_uppercase();
    match family.as_str() {
        "RHEL" | "REDHAT" | "CENTOS" | "ORACLE" | "ORACLELINUX" => {
            meets(os_version, "6.1")
        }
        "ROCKY" => meets(os_version, "8.3"),
        "FEDORA" => meets(os_version, "19"),
        "UBUNTU" => meets(os_version, "14.04"),
        "DEBIAN" => meets(os_version, "6.0"),
        "AIX" => meets(os_version, "5.3"),
        "SUNOS" | "SOLARIS" => meets(os_version, "5.10"),
        "HP-UX" | "HPUX" => meets(os_version, "11.23"),
        "WINDOWS" => true,
        _ => false,
    }
}

/// Whether the middleware engine version has been tested.
pub fn middleware_supported(detail_type: &str, engine_version: &str) -> bool {
    let detail = detail_type.trim().to_ascii_uppercase();
    match detail.as_str() {
        "APACHE" => meets(engine_version, "2.2"),
        "TOMCAT" => meets(engine_version, "7"),
        "JBOSS" => meets(engine_version, "6"),
        "WEBLOGIC" => meets(engine_version, "10"),
        "WEBSPHERE" => meets(engine_version, "7"),
        "JEUS" => meets(engine_version, "6"),
        "WEBTOB" => {
            // Engines report e.g. "WebtoB 5.0" or "Version 4.1.2".
            let stripped = engine_version
                .replace("WebtoB ", "")
                .replace("Version ", "");
            meets(&stripped, "4")
        }
        "NGINX" => meets(engine_version, "1.14"),
        _ => false,
    }
}

/// Whether the database engine version has been tested.
pub fn database_supported(detail_type: &str, engine_version: &str) -> bool {
    let detail = detail_type.trim().to_ascii_uppercase();
    match detail.as_str() {
        "MYSQL" => meets(engine_version, "5.6"),
        "MARIADB" => meets(&mariadb_feature_version(engine_version), "5.5"),
        "MSSQL" | "SQLSERVER" => {
            // Reported as e.g. "Microsoft SQL Server 2012 - 11.0.2100.60".
            let stripped = engine_version
                .replace("Microsoft ", "")
                .replace("SQL ", "")
                .replace("Server ", "");
            let year = stripped.split_whitespace().next().unwrap_or("");
            meets(year, "2012")
        }
        "ORACLE" => meets(engine_version, "10"),
        "SYBASE" => meets(engine_version, "15.7"),
        "TIBERO" => meets(engine_version, "4"),
        "POSTGRE" | "POSTGRESQL" => meets(engine_version, "11"),
        _ => false,
    }
}

/// MariaDB reports e.g. `10.3.29-MariaDB-log`; the feature level is the
/// version with the build suffix and patch component dropped.
fn mariadb_feature_version(version: &str) -> String {
    let base = version
        .split_once('-')
        .map_or(version, |(head, _)| head)
        .trim();
    match base.rsplit_once('.') {
        Some((head, _)) if head.contains('.') => head.to_owned(),
        _ => base.to_owned(),
    }
}
