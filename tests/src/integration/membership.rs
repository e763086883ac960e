//! # Membership Flows
//!
//! SWIM over the mesh envelope, driven round by round:
//!
//! 1. **Probe**: a connected peer answers the direct ping
//! 2. **Failure**: an isolated peer turns SUSPECT, then DEAD once the
//!    suspicion timeout passes, and the news reaches the rest of the mesh
//! 3. **Leave**: a node shutting down is recorded as LEFT by every peer

#[cfg(test)]
mod tests {
    use crate::harness::{node_id, MeshCluster};
    use mesh_01_gossip::{GossipApi, MemberStatus};
    use std::time::Duration;

    const NAMES: [&str; 3] = ["n1", "n2", "n3"];

    fn status_seen_by(cluster: &MeshCluster, observer: &str, peer: &str) -> Option<MemberStatus> {
        cluster
            .node(observer)
            .gossip()
            .member(&node_id(peer))
            .map(|m| m.status)
    }

    #[tokio::test]
    async fn test_connected_peer_answers_direct_probe() {
        let cluster = MeshCluster::new(&NAMES, &[]);
        let gossip = cluster.node("n1").gossip();

        let outcome = gossip.probe_round().await.expect("n1 has peers to probe");
        assert!(outcome.alive);
        assert!(!outcome.indirect);
        assert!(gossip.is_alive(&outcome.target));
        assert_eq!(gossip.members().len(), 2);
    }

    #[tokio::test]
    async fn test_isolated_peer_is_suspected_then_declared_dead() {
        let cluster = MeshCluster::new(&NAMES, &[]);
        let n1 = cluster.node("n1").gossip();
        cluster.router.isolate(&node_id("n3"));

        // The probe target is random; n3 turns up within a few rounds.
        for _ in 0..20 {
            if status_seen_by(&cluster, "n1", "n3") == Some(MemberStatus::Suspect) {
                break;
            }
            n1.probe_round().await;
        }
        assert_eq!(status_seen_by(&cluster, "n1", "n3"), Some(MemberStatus::Suspect));
        // n2 was never cut off.
        assert_eq!(status_seen_by(&cluster, "n1", "n2"), Some(MemberStatus::Alive));

        // Not yet past the timeout.
        assert!(n1.sweep_suspects().is_empty());

        cluster
            .clock
            .advance(n1.config().suspect_timeout() + Duration::from_secs(1));
        assert_eq!(n1.sweep_suspects(), vec![node_id("n3")]);
        assert_eq!(status_seen_by(&cluster, "n1", "n3"), Some(MemberStatus::Dead));
        assert!(!n1.is_alive(&node_id("n3")));

        n1.disseminate().await;
        assert_eq!(status_seen_by(&cluster, "n2", "n3"), Some(MemberStatus::Dead));
    }

    #[tokio::test]
    async fn test_shutdown_is_recorded_as_left() {
        let cluster = MeshCluster::new(&NAMES, &[]);
        let leaving = cluster.node("n2");

        leaving.shutdown().await;
        assert!(leaving.gossip().has_left());
        assert!(leaving.gossip().probe_round().await.is_none());

        for observer in ["n1", "n3"] {
            assert_eq!(
                status_seen_by(&cluster, observer, "n2"),
                Some(MemberStatus::Left),
                "{observer} did not record n2 leaving"
            );
        }
        assert_eq!(cluster.node("n1").gossip().alive_members().len(), 1);
    }
}
