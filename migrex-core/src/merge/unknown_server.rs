//! Peers seen in traffic that no inventory row explains.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use migrex_model::{
    DiscoveredInstance, Domain, InstanceDraft, InstanceKey, InventoryId, ProcessId,
    ProjectId, RegistrationOrigin,
};

use crate::merge::instance;
use crate::ports::store::GraphStore;
use crate::Result;

/// Whether a peer address is worth a look at all. IPv6 peers and the
/// observing host's own addresses are not; a peer that belongs to an
/// already-registered server still gets traffic edges, just no new row.
pub fn is_candidate_peer(peer: &str, own_ips: &HashSet<String>) -> bool {
    peer.matches(':').count() < 2 && !own_ips.contains(peer)
}

/// Find-or-register the discovered-server row for a peer address.
///
/// Unknown servers carry an empty division: nothing beyond the address is
/// known about them. Re-finding one refreshes its finder and keeps it alive.
pub async fn ensure_unknown_server(
    graph: &dyn GraphStore,
    project_id: ProjectId,
    peer_ip: &str,
    finder_inventory_id: InventoryId,
    process_id: Option<ProcessId>,
    now: DateTime<Utc>,
) -> Result<DiscoveredInstance> {
    let draft = InstanceDraft {
        key: InstanceKey::new(project_id, peer_ip, ""),
        domain: Domain::Server,
        detail_type: String::new(),
        name: None,
        vendor: None,
        version: None,
        origin: Some(RegistrationOrigin::Discovered),
        owner_inventory_id: None,
        finder_inventory_id: Some(finder_inventory_id),
        touched_by: process_id,
    };
    instance::upsert_instance(graph, &draft, now).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv6_and_own_addresses_are_skipped() {
        let own: HashSet<String> = ["10.0.0.5".to_owned(), "192.168.1.5".to_owned()].into();
        assert!(!is_candidate_peer("fe80::1c3a:90ff", &own));
        assert!(!is_candidate_peer("10.0.0.5", &own));
        assert!(!is_candidate_peer("192.168.1.5", &own));
        assert!(is_candidate_peer("10.0.0.77", &own));
    }
}
