//! JDBC URL parsing for datasource discovery.
//!
//! Datasource URLs pulled out of middleware and application configuration
//! come in per-vendor shapes; each family gets its own parser, and
//! multi-host URLs yield one endpoint per host.

use migrex_model::DatabaseKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// One database endpoint cut from a JDBC URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdbcEndpoint {
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// URL the endpoint was cut from, kept as the interface descriptor.
    pub raw: String,
}

impl JdbcEndpoint {
    /// Division key of the database instance this endpoint addresses.
    pub fn detail_division(&self) -> String {
        format!("{}|{}", self.port, self.database)
    }
}

pub fn default_port(kind: DatabaseKind) -> u16 {
    match kind {
        DatabaseKind::Oracle => 1521,
        DatabaseKind::MySql | DatabaseKind::MariaDb => 3306,
        DatabaseKind::Tibero => 8629,
        DatabaseKind::MsSql => 1433,
        DatabaseKind::Sybase => 5000,
        DatabaseKind::PostgreSql => 5432,
    }
}

/// Parses a JDBC URL into the endpoints it addresses. Unrecognized URLs
/// come back empty rather than failing the scan.
pub fn parse(raw: &str) -> Vec<JdbcEndpoint> {
    let url = raw.trim().replace("log4jdbc:", "");
    if url.is_empty() {
        return Vec::new();
    }

    let probe = url.to_ascii_lowercase();
    let endpoints = if probe.contains("oracle") {
        parse_at_form(&url, DatabaseKind::Oracle, raw)
    } else if probe.contains("tibero") {
        parse_at_form(&url, DatabaseKind::Tibero, raw)
    } else if probe.contains("sqlserver") {
        parse_sqlserver(&url, raw)
    } else if probe.contains("sybase") {
        parse_sybase(&url, raw)
    } else if probe.contains("mariadb") {
        parse_hostlist_form(&url, DatabaseKind::MariaDb, raw)
    } else if probe.contains("mysql") {
        parse_hostlist_form(&url, DatabaseKind::MySql, raw)
    } else if probe.contains("postgresql") {
        parse_hostlist_form(&url, DatabaseKind::PostgreSql, raw)
    } else {
        Vec::new()
    };

    if endpoints.is_empty() {
        tracing::debug!(url = raw, "no jdbc parser matched the url");
    }
    endpoints
}

/// `jdbc:<scheme>://host[:port][,host[:port]]/database[?params]`
fn parse_hostlist_form(url: &str, kind: DatabaseKind, raw: &str) -> Vec<JdbcEndpoint> {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => return Vec::new(),
    };
    let rest = rest.split(['?', ';']).next().unwrap_or_default();
    let (hosts, database) = match rest.split_once('/') {
        Some((hosts, database)) => (hosts, database),
        None => (rest, ""),
    };
    endpoints_for_peers(hosts, database, kind, raw)
}

fn endpoints_for_peers(
    peers: &str,
    database: &str,
    kind: DatabaseKind,
    raw: &str,
) -> Vec<JdbcEndpoint> {
    peers
        .split(',')
        .filter_map(|peer| {
            let peer = peer.trim();
            if peer.is_empty() {
                return None;
            }
            let (host, port) = split_host_port(peer, kind);
            Some(JdbcEndpoint {
                kind,
                host: host.to_owned(),
                port,
                database: database.to_owned(),
                raw: raw.to_owned(),
            })
        })
        .collect()
}

fn split_host_port(peer: &str, kind: DatabaseKind) -> (&str, u16) {
    match peer.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, port),
            Err(_) => (peer, default_port(kind)),
        },
        None => (peer, default_port(kind)),
    }
}

// (ADDRESS=(PROTOCOL=TCP)(HOST=h)(PORT=p)) blocks; port is optional.
static TNS_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)HOST\s*=\s*([^)\s]+)\s*\)(?:\s*\(\s*PORT\s*=\s*([0-9]+))?").unwrap()
});

static TNS_ORACLE_SERVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:SERVICE_NAME|SID)\s*=\s*([^)\s]+)").unwrap());

static TNS_TIBERO_SERVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DATABASE_NAME\s*=\s*([^)\s]+)").unwrap());

// user@[ldap:][//]host[:port][:sid | /service]
static EASY_CONNECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*?@(?:(?i:ldap):)?(?://)?([^:/(\s]+)(?::([0-9]+))?(?:[:/]([^:/)\s]+))?")
        .unwrap()
});

/// Oracle and Tibero thin/OCI URLs: either a full TNS descriptor or the
/// easy-connect `@host:port:sid` shape. Oracle URLs are uppercased before
/// parsing, which is how their hosts end up uppercase in the graph.
fn parse_at_form(url: &str, kind: DatabaseKind, raw: &str) -> Vec<JdbcEndpoint> {
    let lower = url.to_ascii_lowercase();
    let scheme = match kind {
        DatabaseKind::Oracle => "jdbc:oracle:",
        _ => "jdbc:tibero:",
    };
    let rest = ["thin:", "oci:"].iter().find_map(|driver| {
        let prefix = format!("{scheme}{driver}");
        lower.starts_with(&prefix).then(|| &url[prefix.len()..])
    });
    let Some(rest) = rest else {
        return Vec::new();
    };
    let rest = if kind == DatabaseKind::Oracle {
        rest.to_ascii_uppercase()
    } else {
        rest.to_owned()
    };

    if let Some(endpoints) = parse_tns(&rest, kind, raw) {
        return endpoints;
    }
    parse_easy_connect(&rest, kind, raw)
}

fn parse_tns(rest: &str, kind: DatabaseKind, raw: &str) -> Option<Vec<JdbcEndpoint>> {
    if !rest.to_ascii_uppercase().contains("DESCRIPTION") {
        return None;
    }
    let service = match kind {
        DatabaseKind::Tibero => &TNS_TIBERO_SERVICE,
        _ => &TNS_ORACLE_SERVICE,
    };
    let database = service
        .captures(rest)
        .map(|caps| caps[1].trim().to_owned())
        .unwrap_or_default();

    let endpoints: Vec<JdbcEndpoint> = TNS_ADDRESS
        .captures_iter(rest)
        .map(|caps| {
            let port = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or_else(|| default_port(kind));
            JdbcEndpoint {
                kind,
                host: caps[1].trim().to_owned(),
                port,
                database: database.clone(),
                raw: raw.to_owned(),
            }
        })
        .collect();

    if endpoints.is_empty() {
        None
    } else {
        Some(endpoints)
    }
}

fn parse_easy_connect(rest: &str, kind: DatabaseKind, raw: &str) -> Vec<JdbcEndpoint> {
    let Some(caps) = EASY_CONNECT.captures(rest) else {
        return Vec::new();
    };
    let host = caps[1].to_owned();
    let port = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_else(|| default_port(kind));
    // With no explicit service the instance is addressed by host name.
    let database = caps
        .get(3)
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| host.clone());
    vec![JdbcEndpoint {
        kind,
        host,
        port,
        database,
        raw: raw.to_owned(),
    }]
}

/// `jdbc:sqlserver://host[:port][;key=value;...]`, with `serverName`,
/// `portNumber` and `databaseName` accepted as properties and the
/// `host\instance` form reduced to its host.
fn parse_sqlserver(url: &str, raw: &str) -> Vec<JdbcEndpoint> {
    let (head, props) = match url.split_once(';') {
        Some((head, props)) => (head, Some(props)),
        None => (url, None),
    };
    let host_idx = match head.find("://") {
        Some(idx) => idx,
        None => return Vec::new(),
    };

    let mut server_name = String::new();
    let mut port: u16 = default_port(DatabaseKind::MsSql);
    let mut database = String::new();
    if let Some(props) = props {
        for pair in props.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "servername" => server_name = value.trim().to_owned(),
                "databasename" => database = value.trim().to_owned(),
                "portnumber" => {
                    if let Ok(parsed) = value.trim().parse() {
                        port = parsed;
                    }
                }
                _ => {}
            }
        }
    }

    let url_server = &head[host_idx + 3..];
    if !url_server.is_empty() {
        server_name = url_server.to_owned();
    }
    if let Some(colon) = server_name.rfind(':') {
        if let Ok(parsed) = server_name[colon + 1..].parse() {
            port = parsed;
            server_name.truncate(colon);
        }
    }
    if let Some(backslash) = server_name.find('\\') {
        server_name.truncate(backslash);
    }
    if server_name.is_empty() {
        return Vec::new();
    }

    vec![JdbcEndpoint {
        kind: DatabaseKind::MsSql,
        host: server_name,
        port,
        database,
        raw: raw.to_owned(),
    }]
}

/// `jdbc:sybase:Tds:host:port/database`
fn parse_sybase(url: &str, raw: &str) -> Vec<JdbcEndpoint> {
    let lower = url.to_ascii_lowercase();
    let idx = match lower.find("tds:") {
        Some(idx) => idx + "tds:".len(),
        None => return Vec::new(),
    };
    let rest = url[idx..].split(['?', ';']).next().unwrap_or_default();
    let (peer, database) = match rest.split_once('/') {
        Some((peer, database)) => (peer, database),
        None => (rest, ""),
    };
    let (host, port) = split_host_port(peer, DatabaseKind::Sybase);
    if host.is_empty() {
        return Vec::new();
    }
    vec![JdbcEndpoint {
        kind: DatabaseKind::Sybase,
        host: host.to_owned(),
        port,
        database: database.to_owned(),
        raw: raw.to_owned(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_url_with_params() {
        let endpoints = parse("jdbc:mysql://db01:3307/orders?useSSL=false");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].kind, DatabaseKind::MySql);
        assert_eq!(endpoints[0].host, "db01");
        assert_eq!(endpoints[0].port, 3307);
        assert_eq!(endpoints[0].database, "orders");
    }

    #[test]
    fn postgres_multi_host_yields_one_endpoint_per_peer() {
        let endpoints = parse("jdbc:postgresql://pg1:5433,pg2/billing");
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].host, "pg1");
        assert_eq!(endpoints[0].port, 5433);
        assert_eq!(endpoints[1].host, "pg2");
        assert_eq!(endpoints[1].port, 5432);
        assert!(endpoints.iter().all(|e| e.database == "billing"));
    }

    #[test]
    fn oracle_easy_connect_is_uppercased() {
        let endpoints = parse("jdbc:oracle:thin:@dbhost:1521:orcl");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].host, "DBHOST");
        assert_eq!(endpoints[0].database, "ORCL");
        assert_eq!(endpoints[0].port, 1521);
    }

    #[test]
    fn oracle_tns_descriptor_pairs_hosts_with_their_ports() {
        let url = "jdbc:oracle:thin:@(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=rac1)(PORT=1521))(ADDRESS=(PROTOCOL=TCP)(HOST=rac2)(PORT=1522))(CONNECT_DATA=(SERVICE_NAME=prod)))";
        let endpoints = parse(url);
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].host, "RAC1");
        assert_eq!(endpoints[0].port, 1521);
        assert_eq!(endpoints[1].host, "RAC2");
        assert_eq!(endpoints[1].port, 1522);
        assert!(endpoints.iter().all(|e| e.database == "PROD"));
    }

    #[test]
    fn tibero_keeps_host_case() {
        let endpoints = parse("jdbc:tibero:thin:@TbHost:8629:tb01");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].kind, DatabaseKind::Tibero);
        assert_eq!(endpoints[0].host, "TbHost");
        assert_eq!(endpoints[0].database, "tb01");
    }

    #[test]
    fn sqlserver_reads_database_name_property() {
        let endpoints = parse("jdbc:sqlserver://sql01:1434;databaseName=crm;encrypt=false");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].kind, DatabaseKind::MsSql);
        assert_eq!(endpoints[0].host, "sql01");
        assert_eq!(endpoints[0].port, 1434);
        assert_eq!(endpoints[0].database, "crm");
    }

    #[test]
    fn sqlserver_instance_suffix_is_dropped() {
        let endpoints = parse(r"jdbc:sqlserver://sql01\prod;databaseName=crm");
        assert_eq!(endpoints[0].host, "sql01");
        assert_eq!(endpoints[0].port, 1433);
    }

    #[test]
    fn sybase_tds_form() {
        let endpoints = parse("jdbc:sybase:Tds:syb01:5001/master");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].kind, DatabaseKind::Sybase);
        assert_eq!(endpoints[0].host, "syb01");
        assert_eq!(endpoints[0].port, 5001);
        assert_eq!(endpoints[0].database, "master");
    }

    #[test]
    fn unknown_scheme_yields_nothing() {
        assert!(parse("jdbc:as400://legacy/lib").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn division_joins_port_and_database() {
        let endpoints = parse("jdbc:mysql://db01/orders");
        assert_eq!(endpoints[0].detail_division(), "3306|orders");
    }
}
