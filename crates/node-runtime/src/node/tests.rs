use super::*;
use crate::config::{NodeSection, PeerEntry};
use mesh_01_gossip::{GossipRequest, GossipResponse};
use mesh_02_consensus::ConsensusApi;
use mesh_03_federation::NodeStatus;
use mesh_04_slashing::BlockHeader;
use mesh_05_trust::{TrustConfig, TrustLevel};
use serde_json::json;
use shared_bus::{InMemoryRouter, RouterEndpoint};
use shared_crypto::{Ed25519Identity, Ed25519KeyPair};
use shared_types::{ManualTimeSource, Timestamp};

type Router = InMemoryRouter<MeshRequest, MeshResponse>;
type Node = MeshNode<RouterEndpoint<MeshRequest, MeshResponse>>;

const STAKE: u64 = 20_000;

fn id(name: &str) -> NodeId {
    NodeId::from(name)
}

fn identity(index: usize, name: &str) -> Ed25519Identity {
    Ed25519Identity::new(id(name), Ed25519KeyPair::from_seed([index as u8 + 1; 32]))
}

fn address(name: &str) -> String {
    format!("{name}.mesh.io:7000")
}

struct Cluster {
    router: Router,
    nodes: Vec<Arc<Node>>,
    identities: Vec<Ed25519Identity>,
}

impl Cluster {
    fn new(names: &[&str], admins: &[&str]) -> Self {
        let router = Router::new();
        let clock = ManualTimeSource::new(Timestamp::from_secs(1_000));
        let identities: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| identity(i, n))
            .collect();

        let nodes = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let peers = names
                    .iter()
                    .zip(&identities)
                    .filter(|(other, _)| *other != name)
                    .map(|(other, key)| PeerEntry {
                        public_key: Some(key.public_key()),
                        stake: Some(STAKE),
                        ..PeerEntry::new(*other, address(other))
                    })
                    .collect();
                let mut config = NodeConfig {
                    node: NodeSection {
                        id: name.to_string(),
                        address: address(name),
                        stake: Some(STAKE),
                        peers,
                        ..NodeSection::default()
                    },
                    trust: TrustConfig {
                        admins: admins.iter().map(|a| id(a)).collect(),
                        ..TrustConfig::default()
                    },
                    ..NodeConfig::default()
                };
                config.consensus.rng_seed = Some(21 + i as u64);
                config.gossip.rng_seed = Some(61 + i as u64);

                let node = Arc::new(
                    MeshNode::build(
                        &config,
                        Arc::new(identity(i, name)),
                        Arc::new(router.endpoint(id(name))),
                        Arc::new(clock.clone()),
                    )
                    .unwrap(),
                );
                router.register(id(name), node.clone());
                node
            })
            .collect();

        Self {
            router,
            nodes,
            identities,
        }
    }

    fn get(&self, name: &str) -> &Arc<Node> {
        self.nodes.iter().find(|n| n.id().as_str() == name).unwrap()
    }

    fn key(&self, name: &str) -> &Ed25519Identity {
        self.identities
            .iter()
            .find(|k| k.node_id().as_str() == name)
            .unwrap()
    }

    async fn tick_until(&self, max_ticks: usize, done: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            for node in &self.nodes {
                let _ = node.consensus().tick().await;
            }
        }
        done(self)
    }

    fn leader(&self) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|n| n.consensus().is_leader())
    }

    /// Double-sign evidence against `name` at `height`.
    fn double_sign(&self, name: &str, height: u64) -> SlashingEvidence {
        let header = |block: u8| {
            BlockHeader::new(
                height,
                ContentHash([block; 32]),
                ContentHash([0; 32]),
                Timestamp::from_secs(990),
                id(name),
            )
            .signed_by(self.key(name))
            .unwrap()
        };
        SlashingEvidence::double_sign(header(0xaa), header(0xbb), Timestamp::from_secs(1_000))
    }
}

/// Feed every governance and trust event seen so far through the node.
async fn settle(node: &Node, subscription: &mut Subscription) {
    for event in subscription.drain() {
        node.handle_event(&event).await;
    }
}

fn governance(node: &Node) -> Subscription {
    node.events().subscribe(EventFilter::topics(vec![
        EventTopic::Governance,
        EventTopic::Trust,
    ]))
}

#[test]
fn test_build_admits_founding_members() {
    let cluster = Cluster::new(&["a", "b", "c"], &["a"]);
    let a = cluster.get("a");

    assert_eq!(a.federation().status().active_nodes, 3);
    let record = a.federation().get_node(&id("b")).unwrap();
    assert_eq!(record.public_key, cluster.key("b").public_key());
    assert_eq!(
        a.trust().with_registry(|r, _| r.identity(&id("c")).cloned()),
        Some(cluster.key("c").public_key())
    );
    assert_eq!(a.trust().get_trust_level(&id("a")), TrustLevel::Admin);
    // The local node is not part of its own membership list.
    let mut alive: Vec<NodeId> = a
        .gossip()
        .alive_members()
        .into_iter()
        .map(|m| m.id)
        .collect();
    alive.sort();
    assert_eq!(alive, vec![id("b"), id("c")]);
}

#[tokio::test]
async fn test_consensus_runs_over_mesh_wire() {
    let cluster = Cluster::new(&["a", "b", "c"], &[]);
    assert!(cluster.tick_until(100, |c| c.leader().is_some()).await);
    let leader = cluster.leader().unwrap().clone();
    assert!(leader.consensus().status().term >= 1);

    let index = leader
        .consensus()
        .propose(json!({"action": "SET", "key": "x", "value": 42}))
        .await
        .unwrap();
    let replicated = cluster
        .tick_until(20, |c| {
            c.nodes
                .iter()
                .all(|n| n.state_machine().get("x") == Some(json!(42)))
        })
        .await;
    assert!(replicated);
    for node in &cluster.nodes {
        assert!(node.state_machine().applied_indices().contains(&index));
    }
    assert!(cluster.router.stats().delivered > 0);
}

#[tokio::test]
async fn test_slashing_ban_propagates_to_peers() {
    let cluster = Cluster::new(&["a", "b", "c"], &["a", "b", "c"]);
    let a = cluster.get("a");
    let mut events = governance(a);

    let evidence = cluster.double_sign("c", 100);
    let verdict = a.submit_evidence(evidence.clone());
    assert!(verdict.is_valid, "{}", verdict.reason);
    assert_eq!(verdict.action, Some(SlashingAction::Ban));
    assert_eq!(verdict.stake_slashed, STAKE);
    assert_eq!(
        a.federation().get_node(&id("c")).unwrap().status,
        NodeStatus::Banned
    );

    settle(a, &mut events).await;

    let proof = a.trust().get_ban_proof(&id("c")).unwrap();
    assert_eq!(proof.reason, BanReason::DoubleSign);
    assert_eq!(proof.evidence_hash, evidence.evidence_hash);
    assert_eq!(proof.issuer_node_id, id("a"));
    assert!(cluster.get("b").trust().get_ban_proof(&id("c")).is_some());
    assert_eq!(
        cluster.get("b").trust().get_trust_level(&id("c")),
        TrustLevel::Banned
    );

    let replay = a.submit_evidence(evidence);
    assert!(replay.is_replay());
    assert!(replay.reason.starts_with("REPLAY"));
}

#[tokio::test]
async fn test_accepted_ban_expels_member() {
    let cluster = Cluster::new(&["a", "b", "c"], &["a", "b", "c"]);
    let a = cluster.get("a");
    let b = cluster.get("b");
    let mut events = governance(b);

    let proof = a
        .enforce_ban(&id("c"), "DOUBLE_SIGN", ContentHash([9; 32]))
        .unwrap();
    // The rumor may reach b before the direct push, which then replays.
    assert!(a.propagate_ban(&proof).await <= 1);
    assert!(b.trust().get_ban_proof(&id("c")).is_some());

    settle(b, &mut events).await;
    assert_eq!(
        b.federation().get_node(&id("c")).unwrap().status,
        NodeStatus::Banned
    );
}

#[tokio::test]
async fn test_banned_peer_is_rejected_at_the_gate() {
    let cluster = Cluster::new(&["a", "b", "c"], &["a"]);
    let a = cluster.get("a");
    a.enforce_ban(&id("c"), "DOUBLE_SIGN", ContentHash([9; 32]))
        .unwrap();

    let ping = |from: &str| {
        MeshRequest::Gossip(GossipRequest::Ping { from: id(from) })
    };
    let response = a.handle(&id("c"), ping("c")).await;
    assert_eq!(response, Some(MeshResponse::rejected("peer c is banned")));

    let response = a.handle(&id("b"), ping("b")).await;
    assert_eq!(
        response,
        Some(MeshResponse::Gossip(GossipResponse::Pong { from: id("a") }))
    );
}

#[tokio::test]
async fn test_ban_push_replay_is_declined() {
    let cluster = Cluster::new(&["a", "b", "c"], &["a"]);
    let proof = cluster
        .get("a")
        .enforce_ban(&id("c"), "DOUBLE_VOTE", ContentHash([4; 32]))
        .unwrap();
    let push = MeshRequest::Governance(GovernanceRequest::BanProof(proof));
    let b = cluster.get("b");

    assert_eq!(
        b.handle(&id("a"), push.clone()).await,
        Some(MeshResponse::Governance(GovernanceResponse::BanAck {
            accepted: true,
            reason: None
        }))
    );
    let Some(MeshResponse::Governance(GovernanceResponse::BanAck { accepted, reason })) =
        b.handle(&id("a"), push).await
    else {
        panic!("expected a ban ack");
    };
    assert!(!accepted);
    assert!(reason.unwrap().starts_with("REPLAY"));
}

#[tokio::test]
async fn test_only_admins_issue_bans() {
    let cluster = Cluster::new(&["a", "b", "c"], &["a"]);
    let b = cluster.get("b");
    assert!(b
        .enforce_ban(&id("c"), "DOUBLE_SIGN", ContentHash([1; 32]))
        .is_none());
    assert!(b.trust().active_bans().is_empty());
}

#[tokio::test]
async fn test_start_and_shutdown() {
    let cluster = Cluster::new(&["a", "b", "c"], &[]);
    for node in &cluster.nodes {
        node.start();
        node.start();
        assert_eq!(node.tasks.lock().len(), 5);
    }
    for node in &cluster.nodes {
        node.shutdown().await;
        assert!(node.tasks.lock().is_empty());
        assert!(node.gossip().has_left());
    }
}

#[test]
fn test_data_dir_stores_survive_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let router = Router::new();
    let clock = Arc::new(ManualTimeSource::new(Timestamp::from_secs(1_000)));
    let config = NodeConfig {
        node: NodeSection {
            id: "solo".into(),
            address: address("solo"),
            data_dir: Some(dir.path().to_path_buf()),
            ..NodeSection::default()
        },
        trust: TrustConfig {
            admins: vec![id("solo")],
            ..TrustConfig::default()
        },
        ..NodeConfig::default()
    };

    let build = || {
        MeshNode::build(
            &config,
            Arc::new(identity(0, "solo")),
            Arc::new(router.endpoint(id("solo"))),
            clock.clone(),
        )
        .unwrap()
    };

    let node = build();
    node.enforce_ban(&id("rogue"), "DOUBLE_SIGN", ContentHash([3; 32]))
        .unwrap();
    drop(node);

    let node = build();
    assert_eq!(node.trust().get_trust_level(&id("rogue")), TrustLevel::Banned);
    assert!(dir.path().join("trust_registry.json").exists());
}
