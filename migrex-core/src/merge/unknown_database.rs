//! Database engines spotted in a server's process list.
//!
//! A server scan sees every running process; listener processes of known
//! engine families give away databases nobody registered. Candidates are
//! only worth recording when they actually listen on a port and neither the
//! inventory nor the graph already has them.

use migrex_model::{
    DatabaseKind, Domain, InstanceDraft, InstanceKey, ListenPort, ProcessInfo,
    RegistrationOrigin, ServerFinding, WorkItem,
};

use crate::merge::instance;
use crate::ports::store::{GraphStore, InventoryStore};
use crate::Result;

/// Engine candidate cut from the process list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDatabase {
    pub kind: DatabaseKind,
    pub port: u16,
}

/// Engine family betrayed by a process command line.
///
/// MariaDB ships a `mysqld` binary, so the install path decides between the
/// two before the plain `mysqld` match runs.
fn database_kind(command: &str) -> Option<DatabaseKind> {
    let command = command.to_lowercase();
    if command.contains("tnslsnr") {
        Some(DatabaseKind::Oracle)
    } else if command.contains("mysqld") && command.contains("mariadb") {
        Some(DatabaseKind::MariaDb)
    } else if command.contains("mysqld") {
        Some(DatabaseKind::MySql)
    } else if command.contains("tblistener") {
        Some(DatabaseKind::Tibero)
    } else if command.contains("dataserver") || command.contains("sqlsrvr") {
        Some(DatabaseKind::Sybase)
    } else if command.contains("sqlservr") {
        Some(DatabaseKind::MsSql)
    } else if command.contains("postgres") {
        Some(DatabaseKind::PostgreSql)
    } else {
        None
    }
}

fn listen_port_of(listen_ports: &[ListenPort], pid: i32) -> Option<u16> {
    listen_ports
        .iter()
        .find(|entry| entry.pid == Some(pid))
        .map(|entry| entry.port)
}

/// Scans processes for engine listeners. Processes without a listening
/// port are dropped; several engines may share a box.
pub fn detect(processes: &[ProcessInfo], listen_ports: &[ListenPort]) -> Vec<UnknownDatabase> {
    processes
        .iter()
        .filter_map(|process| {
            let kind = database_kind(&process.command)?;
            let port = listen_port_of(listen_ports, process.pid)?;
            Some(UnknownDatabase { kind, port })
        })
        .collect()
}

/// Registers unknown databases found by a server scan into the graph.
/// Returns how many new instances were recorded.
pub async fn discover(
    graph: &dyn GraphStore,
    inventory: &dyn InventoryStore,
    item: &WorkItem,
    finding: &ServerFinding,
) -> Result<usize> {
    let candidates = detect(&finding.processes, &finding.listen_ports);
    if candidates.is_empty() {
        return Ok(0);
    }

    let registered = inventory
        .registered_database_ports(item.project_id, item.inventory_id)
        .await?;

    let mut created = 0;
    for candidate in candidates {
        if registered.contains(&candidate.port) {
            tracing::debug!(
                port = candidate.port,
                kind = %candidate.kind,
                "database already registered on this server"
            );
            continue;
        }

        // The database name is unknowable from the outside, so the division
        // carries only the port.
        let key = InstanceKey::new(
            item.project_id,
            item.connection.ip_address.clone(),
            format!("{}|", candidate.port),
        );
        if graph.find_instance(&key).await?.is_some() {
            continue;
        }

        let draft = InstanceDraft {
            key,
            domain: Domain::Database,
            detail_type: candidate.kind.as_code().to_owned(),
            name: None,
            vendor: None,
            version: None,
            origin: Some(RegistrationOrigin::Discovered),
            owner_inventory_id: None,
            finder_inventory_id: Some(item.inventory_id),
            touched_by: Some(item.process_id),
        };
        instance::upsert_instance(graph, &draft, chrono::Utc::now()).await?;
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pid: i32, command: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            user: None,
            command: command.into(),
        }
    }

    fn listen(pid: i32, port: u16) -> ListenPort {
        ListenPort {
            protocol: "tcp".into(),
            ip_address: "0.0.0.0".into(),
            port,
            pid: Some(pid),
        }
    }

    #[test]
    fn mariadb_path_wins_over_plain_mysqld() {
        assert_eq!(
            database_kind("/usr/local/mariadb/bin/mysqld --datadir=/data"),
            Some(DatabaseKind::MariaDb)
        );
        assert_eq!(
            database_kind("/usr/sbin/mysqld"),
            Some(DatabaseKind::MySql)
        );
    }

    #[test]
    fn listener_families_are_recognized() {
        assert_eq!(database_kind("/oracle/bin/tnslsnr LISTENER"), Some(DatabaseKind::Oracle));
        assert_eq!(database_kind("/sybase/ASE/bin/dataserver"), Some(DatabaseKind::Sybase));
        assert_eq!(database_kind("/opt/mssql/bin/sqlservr"), Some(DatabaseKind::MsSql));
        assert_eq!(database_kind("postgres: checkpointer"), Some(DatabaseKind::PostgreSql));
        assert_eq!(database_kind("/usr/sbin/sshd -D"), None);
    }

    #[test]
    fn candidates_need_a_listening_port() {
        let processes = vec![
            process(100, "/usr/sbin/mysqld"),
            process(200, "postgres: logical replication launcher"),
        ];
        let listens = vec![listen(100, 3306)];

        let found = detect(&processes, &listens);
        assert_eq!(
            found,
            vec![UnknownDatabase {
                kind: DatabaseKind::MySql,
                port: 3306
            }]
        );
    }
}
