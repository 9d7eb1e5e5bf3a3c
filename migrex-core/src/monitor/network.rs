//! Established-connection feeds: traffic classification and peer discovery.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use migrex_model::{
    InventoryId, NetworkConnection, PortRelation, ProjectId, TrafficDirection,
};

use crate::merge::{unknown_server, well_known};
use crate::monitor::window::parse_line_date;
use crate::orchestrator::DomainLocks;
use crate::ports::store::{GraphStore, InventoryStore};
use crate::{AssessError, Result};

/// One feed's established connections, split by direction.
#[derive(Debug, Default)]
pub struct TrafficSplit {
    /// Conversations arriving at a port this host listens on.
    pub to_local: Vec<NetworkConnection>,
    /// Everything else, outbound from the host's point of view.
    pub to_any: Vec<NetworkConnection>,
}

/// Classifies the established lines of a network feed.
///
/// Feed layout per line:
/// `date,protocol,state,local_addr,local_port,foreign_addr,foreign_port,pid`.
/// LISTEN lines only contribute the set of listening ports. Loopback-to-
/// loopback chatter, `wait` states and lines with unreadable ports or dates
/// are dropped.
pub fn classify_traffic(feed: &str) -> TrafficSplit {
    let listening: HashSet<u16> = feed.lines().filter_map(listen_port).collect();

    let mut split = TrafficSplit::default();
    for line in feed.lines() {
        let Some(conn) = parse_established(line) else {
            continue;
        };
        if listening.contains(&conn.local_port) {
            split.to_local.push(conn);
        } else {
            split.to_any.push(conn);
        }
    }
    split
}

fn listen_port(line: &str) -> Option<u16> {
    if !line.contains("LISTEN,") {
        return None;
    }
    let fields: Vec<&str> = line.split(',').collect();
    fields.get(4)?.trim().parse().ok()
}

fn parse_established(line: &str) -> Option<NetworkConnection> {
    let line = line.trim();
    if line.is_empty() || line.contains("LISTEN,") {
        return None;
    }
    let fields: Vec<&str> = line.splitn(8, ',').collect();
    if fields.len() < 8 {
        trace!(line, "short network line, dropped");
        return None;
    }

    let state = fields[2].trim();
    if state.eq_ignore_ascii_case("wait") {
        return None;
    }
    let local_addr = fields[3].trim();
    let foreign_addr = fields[5].trim();
    if local_addr == "127.0.0.1" && foreign_addr == "127.0.0.1" {
        return None;
    }

    let observed_at = parse_line_date(fields[0])?;
    let local_port = fields[4].trim().parse().ok()?;
    let foreign_port = fields[6].trim().parse().ok()?;

    Some(NetworkConnection {
        observed_at,
        protocol: fields[1].trim().to_owned(),
        state: state.to_owned(),
        local_addr: local_addr.to_owned(),
        local_port,
        foreign_addr: foreign_addr.to_owned(),
        foreign_port,
        pid: fields[7].trim().parse().ok(),
    })
}

/// Folds network feeds into the discovery graph: unknown peers become
/// discovered servers, and every conversation becomes a port relation on
/// the monitored server.
pub struct NetworkObserver {
    graph: Arc<dyn GraphStore>,
    inventory: Arc<dyn InventoryStore>,
    locks: Arc<DomainLocks>,
}

impl NetworkObserver {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        inventory: Arc<dyn InventoryStore>,
        locks: Arc<DomainLocks>,
    ) -> Self {
        NetworkObserver {
            graph,
            inventory,
            locks,
        }
    }

    /// Ingests one feed for a monitored server.
    ///
    /// Peer handling runs under the discovery lock so concurrent feeds
    /// cannot race two rows for the same unknown peer.
    pub async fn ingest(
        &self,
        project_id: ProjectId,
        server_inventory_id: InventoryId,
        feed: &str,
    ) -> Result<()> {
        let split = classify_traffic(feed);
        if split.to_local.is_empty() && split.to_any.is_empty() {
            return Ok(());
        }

        let _discovery = self.locks.discovery.lock().await;

        let Some(own_ip) = self.inventory.server_primary_ip(server_inventory_id).await? else {
            return Err(AssessError::Internal(format!(
                "no registered address for server inventory {server_inventory_id}"
            )));
        };
        let own_ips = self.inventory.server_interface_ips(server_inventory_id).await?;
        let known_ips = self.inventory.known_server_ips(project_id).await?;
        let now = Utc::now();

        let peers: BTreeSet<&str> = split
            .to_any
            .iter()
            .chain(&split.to_local)
            .map(|conn| conn.foreign_addr.as_str())
            .collect();

        for peer in peers {
            if !unknown_server::is_candidate_peer(peer, &own_ips) {
                continue;
            }
            if !known_ips.contains(peer) {
                unknown_server::ensure_unknown_server(
                    self.graph.as_ref(),
                    project_id,
                    peer,
                    server_inventory_id,
                    None,
                    now,
                )
                .await?;
            }
            self.record_relations(server_inventory_id, &own_ip, peer, &split)
                .await?;
        }
        Ok(())
    }

    async fn record_relations(
        &self,
        server_inventory_id: InventoryId,
        own_ip: &str,
        peer: &str,
        split: &TrafficSplit,
    ) -> Result<()> {
        for conn in split.to_any.iter().filter(|c| c.foreign_addr == peer) {
            self.record_one(server_inventory_id, own_ip, peer, conn, TrafficDirection::Outbound)
                .await?;
        }
        for conn in split.to_local.iter().filter(|c| c.foreign_addr == peer) {
            self.record_one(server_inventory_id, own_ip, peer, conn, TrafficDirection::Inbound)
                .await?;
        }
        Ok(())
    }

    async fn record_one(
        &self,
        server_inventory_id: InventoryId,
        own_ip: &str,
        peer: &str,
        conn: &NetworkConnection,
        direction: TrafficDirection,
    ) -> Result<()> {
        // The service port is the stable end of the conversation.
        let port = match direction {
            TrafficDirection::Inbound => conn.local_port,
            TrafficDirection::Outbound => conn.foreign_port,
        };
        let relation = PortRelation {
            server_inventory_id,
            ip_address: own_ip.to_owned(),
            protocol: conn.protocol.clone(),
            direction,
            port,
            peer_ip: peer.to_owned(),
            service_guess: well_known::service_for(&conn.protocol, port),
            local_port: conn.local_port,
            foreign_port: conn.foreign_port,
            observed_by: None,
        };
        if self.graph.insert_port_relation(&relation).await? {
            debug!(peer, port, direction = %direction, "recorded traffic relation");
        }
        Ok(())
    }
}

impl fmt::Debug for NetworkObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkObserver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listening_ports_split_inbound_from_outbound() {
        let feed = "20240301100000,tcp,LISTEN,0.0.0.0,8080,0.0.0.0,0,312\n\
                    20240301100010,tcp,ESTABLISHED,10.0.0.5,8080,10.0.0.9,52100,312\n\
                    20240301100010,tcp,ESTABLISHED,10.0.0.5,41022,10.0.0.30,1521,519\n";

        let split = classify_traffic(feed);
        assert_eq!(split.to_local.len(), 1);
        assert_eq!(split.to_local[0].foreign_addr, "10.0.0.9");
        assert_eq!(split.to_any.len(), 1);
        assert_eq!(split.to_any[0].foreign_port, 1521);
    }

    #[test]
    fn noise_lines_are_dropped() {
        let feed = "20240301100010,tcp,ESTABLISHED,127.0.0.1,8080,127.0.0.1,52100,312\n\
                    20240301100010,tcp,TIME_WAIT,10.0.0.5,8080,10.0.0.9,52100,312\n\
                    20240301100010,tcp,WAIT,10.0.0.5,8080,10.0.0.9,52100,312\n\
                    20240301100010,tcp,ESTABLISHED,10.0.0.5,none,10.0.0.9,52100,312\n\
                    garbage\n";

        let split = classify_traffic(feed);
        // TIME_WAIT survives; only the literal wait state is filtered.
        assert_eq!(split.to_any.len(), 1);
        assert_eq!(split.to_any[0].state, "TIME_WAIT");
    }

    #[test]
    fn pid_is_optional() {
        let feed = "20240301100010,udp,ESTABLISHED,10.0.0.5,68,10.0.0.1,67,-\n";
        let split = classify_traffic(feed);
        assert_eq!(split.to_any[0].pid, None);
    }
}
