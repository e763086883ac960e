//! # Consensus Flows
//!
//! Raft over the mesh envelope:
//!
//! 1. **Election**: three nodes agree on exactly one leader
//! 2. **Replication**: a SET command lands at the same index everywhere
//! 3. **Partition**: an isolated leader is replaced by a higher term and
//!    steps down once the partition heals

#[cfg(test)]
mod tests {
    use crate::harness::{node_id, MeshCluster};
    use mesh_02_consensus::{ConsensusApi, Role};
    use serde_json::json;

    const NAMES: [&str; 3] = ["n1", "n2", "n3"];

    #[tokio::test]
    async fn test_three_nodes_elect_one_leader() {
        let cluster = MeshCluster::new(&NAMES, &[]);

        let elected = cluster.tick_until(100, |c| c.leader().is_some()).await;
        assert!(elected, "no leader within 100 ticks");

        // A few more rounds let every follower hear from the leader.
        for _ in 0..5 {
            cluster.tick().await;
        }
        assert_eq!(cluster.leaders().len(), 1);
        let leader = cluster.leader().unwrap();
        let term = leader.consensus().status().term;
        assert!(term >= 1);
        for node in cluster.nodes() {
            let status = node.consensus().status();
            assert_eq!(status.term, term);
            assert_eq!(status.leader.as_ref(), Some(leader.id()));
        }
    }

    #[tokio::test]
    async fn test_set_replicates_at_same_index() {
        let cluster = MeshCluster::new(&NAMES, &[]);
        assert!(cluster.tick_until(100, |c| c.leader().is_some()).await);
        let leader = cluster.leader().unwrap().clone();

        let index = leader
            .consensus()
            .propose(json!({"action": "SET", "key": "x", "value": 42}))
            .await
            .unwrap();

        let applied = cluster
            .tick_until(30, |c| {
                c.nodes()
                    .iter()
                    .all(|n| n.state_machine().get("x") == Some(json!(42)))
            })
            .await;
        assert!(applied);

        for node in cluster.nodes() {
            assert!(node.consensus().status().commit_index >= index);
            assert!(node.state_machine().applied_indices().contains(&index));
        }
    }

    #[tokio::test]
    async fn test_follower_proposal_is_refused() {
        let cluster = MeshCluster::new(&NAMES, &[]);
        assert!(cluster.tick_until(100, |c| c.leader().is_some()).await);
        let follower = cluster
            .nodes()
            .iter()
            .find(|n| !n.consensus().is_leader())
            .unwrap();

        let result = follower
            .consensus()
            .propose(json!({"action": "SET", "key": "y", "value": 1}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_isolated_leader_is_replaced_and_converges() {
        let cluster = MeshCluster::new(&NAMES, &[]);
        assert!(cluster.tick_until(100, |c| c.leader().is_some()).await);
        let old = cluster.leader().unwrap().clone();
        let old_term = old.consensus().status().term;
        let majority: Vec<&str> = NAMES
            .iter()
            .copied()
            .filter(|name| node_id(name) != *old.id())
            .collect();

        cluster.router.isolate(old.id());
        let stranded = old
            .consensus()
            .propose(json!({"action": "SET", "key": "lost", "value": true}))
            .await
            .unwrap();

        let replaced = cluster
            .tick_until(100, |c| {
                c.leaders_among(&majority)
                    .iter()
                    .any(|(_, term)| *term > old_term)
            })
            .await;
        assert!(replaced, "majority did not elect a new leader");
        assert!(old.consensus().status().commit_index < stranded);

        let (new_id, _) = cluster.leaders_among(&majority)[0].clone();
        cluster
            .node(new_id.as_str())
            .consensus()
            .propose(json!({"action": "SET", "key": "x", "value": 7}))
            .await
            .unwrap();

        cluster.router.heal_all();
        let converged = cluster
            .tick_until(60, |c| {
                !old.consensus().is_leader()
                    && c.nodes()
                        .iter()
                        .all(|n| n.state_machine().get("x") == Some(json!(7)))
            })
            .await;
        assert!(converged, "old leader did not rejoin");

        let status = old.consensus().status();
        assert_eq!(status.role, Role::Follower);
        assert!(status.term > old_term);
        assert_eq!(old.state_machine().get("lost"), None);
    }
}
